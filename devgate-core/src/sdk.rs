//! Helpers for reading fields from generated AWS SDK shapes

/// Reads a field accessor as an optional borrow.
///
/// Generated SDK accessors return either `&T` or `Option<&T>` depending on
/// whether the service model marks the member as required, and that marking
/// differs between services.
pub trait SdkField<'a, T: ?Sized> {
    fn field(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> SdkField<'a, T> for &'a T {
    fn field(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> SdkField<'a, T> for Option<&'a T> {
    fn field(self) -> Option<&'a T> {
        self
    }
}
