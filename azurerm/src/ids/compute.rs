use super::{provider, resource_id, Segment, RESOURCE_GROUP, SUBSCRIPTION};

resource_id!(
    ManagedDiskId, "Managed Disk",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        provider("Microsoft.Compute"),
        Segment::captured("disks", "diskName"),
    ],
    fields: [subscription_id, resource_group, name],
);
