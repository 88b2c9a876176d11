//! CRM 记录：联系人、案例、发票

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into().to_lowercase(),
            created_at: Utc::now(),
        }
    }
}

/// 服务案例（工单）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    /// 面向用户的工单号，如 CAS-1A2B3C4D
    pub ticket_number: String,
    pub contact_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Case {
    pub fn new(contact_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        let short = id.simple().to_string()[..8].to_uppercase();
        Self {
            id,
            ticket_number: format!("CAS-{}", short),
            contact_id,
            title: title.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub invoice_number: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(contact_id: Uuid, invoice_number: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            invoice_number: invoice_number.into(),
            amount,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_number_format() {
        let case = Case::new(Uuid::new_v4(), "Broken card", "It does not swipe");
        assert!(case.ticket_number.starts_with("CAS-"));
        assert_eq!(case.ticket_number.len(), 12);
    }

    #[test]
    fn test_contact_email_lowercased() {
        let contact = Contact::new("Ada", "Ada@Example.COM");
        assert_eq!(contact.email, "ada@example.com");
    }
}
