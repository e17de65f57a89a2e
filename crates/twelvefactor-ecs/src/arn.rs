//! Amazon Resource Name parsing.
//!
//! `arn:partition:service:region:account-id:resource`, where the resource
//! part is `type/id`, `type/parent/id` or `type:id`.

use crate::error::{EcsError, EcsResult};

/// A parsed ARN borrowing from the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account: &'a str,
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    pub fn parse(s: &'a str) -> EcsResult<Self> {
        let mut parts = s.splitn(6, ':');
        let invalid = || EcsError::InvalidArn(s.to_string());

        if parts.next() != Some("arn") {
            return Err(invalid());
        }
        let partition = parts.next().ok_or_else(invalid)?;
        let service = parts.next().ok_or_else(invalid)?;
        let region = parts.next().ok_or_else(invalid)?;
        let account = parts.next().ok_or_else(invalid)?;
        let resource = parts.next().ok_or_else(invalid)?;
        if resource.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            partition,
            service,
            region,
            account,
            resource,
        })
    }

    /// The trailing identifier of the resource part.
    pub fn resource_id(&self) -> &'a str {
        self.resource
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(self.resource)
    }
}

/// Extract the resource id from an ARN string.
pub fn resource_id(s: &str) -> EcsResult<&str> {
    let id = Arn::parse(s)?.resource_id();
    if id.is_empty() {
        return Err(EcsError::InvalidArn(s.to_string()));
    }
    Ok(id)
}

/// Service name for an entry of a service listing: the resource id of an
/// ARN, or the entry itself when it is a bare name. `None` for empty or
/// malformed entries.
pub fn service_name(entry: &str) -> Option<&str> {
    if entry.starts_with("arn:") {
        resource_id(entry).ok()
    } else if entry.is_empty() {
        None
    } else {
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_task_arn() {
        let arn = Arn::parse(
            "arn:aws:ecs:us-east-1:012345678910:task/0b69d5c0-d655-4695-98cd-5d2d526d9d5a",
        )
        .unwrap();
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "ecs");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.account, "012345678910");
        assert_eq!(arn.resource_id(), "0b69d5c0-d655-4695-98cd-5d2d526d9d5a");
    }

    #[test]
    fn resource_id_of_cluster_scoped_arn() {
        assert_eq!(
            resource_id("arn:aws:ecs:us-east-1:012345678910:service/cluster/app--web").unwrap(),
            "app--web"
        );
        assert_eq!(
            resource_id("arn:aws:ecs:us-east-1:012345678910:task-definition/app--web:3").unwrap(),
            "3"
        );
    }

    #[test]
    fn invalid_arns() {
        assert!(Arn::parse("app--web").is_err());
        assert!(Arn::parse("arn:aws:ecs").is_err());
        assert!(Arn::parse("arn:aws:ecs:us-east-1:012345678910:").is_err());
        assert!(resource_id("arn:aws:ecs:us-east-1:012345678910:service/").is_err());
    }

    #[test]
    fn service_name_accepts_arns_and_bare_names() {
        assert_eq!(
            service_name("arn:aws:ecs:us-east-1:012345678910:service/app--web"),
            Some("app--web")
        );
        assert_eq!(service_name("app--web"), Some("app--web"));
        assert_eq!(service_name(""), None);
        assert_eq!(service_name("arn:broken"), None);
    }
}
