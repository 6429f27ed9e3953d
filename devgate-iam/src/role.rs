//! Logical names the stack template gives to per-function resources

/// Session name used when assuming execution roles
pub const SESSION_NAME: &str = "devgate-dev-proxy";

/// Logical name of a function, `users` -> `Users`
pub fn template_lambda_name(definition_name: &str) -> String {
    let mut chars = definition_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Logical id of the execution role created for a definition
pub fn template_role_name(definition_name: &str) -> String {
    format!(
        "ExecutionRoleForLambda{}",
        template_lambda_name(definition_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_role_name() {
        assert_eq!(template_role_name("listUsers"), "ExecutionRoleForLambdaListUsers");
        assert_eq!(template_role_name("Index"), "ExecutionRoleForLambdaIndex");
    }

    #[test]
    fn test_template_lambda_name_keeps_rest() {
        assert_eq!(template_lambda_name("getHTML"), "GetHTML");
        assert_eq!(template_lambda_name(""), "");
    }
}
