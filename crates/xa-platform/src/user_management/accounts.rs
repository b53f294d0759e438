//! Inactive account detection

use bson::Bson;
use std::collections::HashSet;

use crate::shared::document::id_string;
use crate::user_management::entity::{InactiveAccount, UserAccount};

/// Users that started no run in the window, in directory order.
///
/// `active_user_ids` are the `startingUserId` values of recent runs. Ids
/// without a matching account are ignored.
pub fn find_inactive_accounts(
    accounts: &[UserAccount],
    active_user_ids: &[Bson],
    service_account_idp_ids: &HashSet<String>,
) -> Vec<InactiveAccount> {
    let active: HashSet<String> = active_user_ids
        .iter()
        .map(|id| id_string(id).unwrap_or_else(|| id.to_string()))
        .collect();

    accounts
        .iter()
        .filter(|account| !active.contains(&account.id_key()))
        .map(|account| InactiveAccount {
            user_name: account.login_id.clone(),
            is_svc_account: account
                .idp_id
                .as_ref()
                .is_some_and(|idp| service_account_idp_ids.contains(idp)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn account(id: ObjectId, login: &str, idp: &str) -> UserAccount {
        UserAccount {
            id: Bson::ObjectId(id),
            login_id: login.to_string(),
            idp_id: Some(idp.to_string()),
            system_roles: Vec::new(),
        }
    }

    #[test]
    fn test_inactive_and_service_accounts() {
        let (a, b, c) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let accounts = vec![
            account(a, "alice", "kc-a"),
            account(b, "bob", "kc-b"),
            account(c, "svc-etl", "kc-svc"),
        ];
        let svc: HashSet<String> = ["kc-svc".to_string()].into_iter().collect();

        let inactive = find_inactive_accounts(&accounts, &[Bson::ObjectId(a)], &svc);
        assert_eq!(
            inactive,
            vec![
                InactiveAccount { user_name: "bob".into(), is_svc_account: false },
                InactiveAccount { user_name: "svc-etl".into(), is_svc_account: true },
            ]
        );
    }

    #[test]
    fn test_unknown_run_owner_ignored() {
        let a = ObjectId::new();
        let accounts = vec![account(a, "alice", "kc-a")];
        let inactive = find_inactive_accounts(&accounts, &[Bson::ObjectId(ObjectId::new())], &HashSet::new());
        assert_eq!(inactive.len(), 1);
    }
}
