use compact_str::CompactString;
use lifeline_sdk::objects::auth::AccountView;
use uuid::Uuid;

use super::Role;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: CompactString,
    pub secret_hash: String,
    pub role: Role,
    pub phone: CompactString,
    pub active: bool,
    pub created_at: time::OffsetDateTime,
}

impl Account {
    /// API representation. The secret hash never leaves this type.
    pub fn to_view(&self) -> AccountView {
        AccountView {
            id: self.id,
            email: self.email.to_string(),
            role: self.role.into(),
            phone: self.phone.to_string(),
            active: self.active,
            created_at: self.created_at.unix_timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: CompactString,
    pub secret_hash: String,
    pub role: Role,
    pub phone: CompactString,
}
