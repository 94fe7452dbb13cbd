use super::{provider, resource_id, Segment, RESOURCE_GROUP, SUBSCRIPTION};

resource_id!(
    StorageAccountId, "Storage Account",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        provider("Microsoft.Storage"),
        Segment::captured("storageAccounts", "storageAccountName"),
    ],
    fields: [subscription_id, resource_group, name],
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ResourceId;

    #[test]
    fn parses_storage_account() {
        let id = StorageAccountId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct1",
        )
        .unwrap();
        assert_eq!(id, StorageAccountId::new("sub", "rg", "acct1"));
    }

    #[test]
    fn rejects_blob_service_path() {
        assert!(StorageAccountId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct1/blobServices/default",
        )
        .is_err());
    }
}
