use super::{provider, resource_id, Segment, RESOURCE_GROUP, SUBSCRIPTION};

resource_id!(
    AutomationAccountId, "Automation Account",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        provider("Microsoft.Automation"),
        Segment::captured("automationAccounts", "automationAccountName"),
    ],
    fields: [subscription_id, resource_group, name],
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ResourceId;

    #[test]
    fn round_trip() {
        let id = AutomationAccountId::new("sub", "rg", "auto1");
        assert_eq!(AutomationAccountId::parse(&id.id()).unwrap(), id);
        assert!(id.id().contains("/providers/Microsoft.Automation/automationAccounts/auto1"));
    }
}
