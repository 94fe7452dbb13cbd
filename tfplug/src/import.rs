//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID on a single attribute of an otherwise empty state.
///
/// Example: ID "/subscriptions/.../workspaces/ws1" -> state.id = that ID
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

/// Like [`import_state_passthrough_id`], but rejects IDs the parser refuses.
///
/// The parser's error is reported verbatim so users see which segment was
/// wrong.
pub fn import_state_validating_id<T, E, F>(
    ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    parse: F,
) where
    F: FnOnce(&str) -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    if let Err(e) = parse(&request.id) {
        tracing::warn!(id = %request.id, error = %e, "rejected import ID");
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!("import ID {:?} was rejected: {}", request.id, e),
        ));
        return;
    }

    import_state_passthrough_id(ctx, attr_path, request, response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "example".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
            identity: None,
        }
    }

    #[test]
    fn passthrough_sets_attribute() {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("abc"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "abc"
        );
    }

    #[test]
    fn validating_rejects_bad_id() {
        let mut response = ImportResourceStateResponse::default();
        import_state_validating_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("nope"),
            &mut response,
            |id: &str| {
                if id.starts_with('/') {
                    Ok(())
                } else {
                    Err("expected a leading slash")
                }
            },
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("expected a leading slash"));
    }
}
