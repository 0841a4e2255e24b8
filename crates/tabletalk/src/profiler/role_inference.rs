//! Semantic role inference from column names.
//!
//! Roles are bound by first-match substring scanning, not scored: for each
//! role the pattern list is walked in order and the first pattern that hits
//! any column binds the role to the first such column.

use crate::types::{Role, RoleMap};

/// Name patterns per role, in priority order.
fn patterns(role: Role) -> &'static [&'static str] {
    match role {
        Role::Customer => &["customer", "client", "user", "buyer", "name", "account"],
        Role::Sales => &[
            "sales", "revenue", "amount", "total", "value", "price", "cost",
        ],
        Role::Quantity => &["quantity", "qty", "count", "number", "orders"],
        Role::Region => &[
            "region",
            "location",
            "city",
            "state",
            "country",
            "area",
            "territory",
        ],
        Role::Category => &["category", "type", "class", "group", "segment", "product"],
        Role::Date => &[
            "date",
            "time",
            "created",
            "updated",
            "order_date",
            "purchase",
        ],
    }
}

/// Words a user may type to mean a role.
fn synonyms(role: Role) -> &'static [&'static str] {
    match role {
        Role::Customer => &["customer", "customers", "client", "clients"],
        Role::Sales => &["sales", "revenue", "amount", "total"],
        Role::Quantity => &["quantity", "qty", "count", "orders"],
        Role::Region => &["region", "location", "area"],
        Role::Category => &["category", "type", "product"],
        Role::Date => &["date", "time"],
    }
}

/// The role a user term stands for, if it is one of the known synonyms.
///
/// `term` is compared lowercased and untrimmed.
pub fn role_for_term(term: &str) -> Option<Role> {
    let lower = term.to_lowercase();
    Role::ALL
        .into_iter()
        .find(|role| synonyms(*role).contains(&lower.as_str()))
}

/// Guess which column plays each role.
///
/// `intent_hint` is accepted for callers that know which tool is asking; it
/// does not influence matching.
pub fn map_roles<S: AsRef<str>>(columns: &[S], _intent_hint: &str) -> RoleMap {
    let lowered: Vec<String> = columns.iter().map(|c| c.as_ref().to_lowercase()).collect();
    let mut roles = RoleMap::new();

    for role in Role::ALL {
        let found = patterns(role).iter().find_map(|pattern| {
            lowered
                .iter()
                .position(|col| col.contains(pattern))
                .map(|idx| columns[idx].as_ref())
        });
        if let Some(column) = found {
            roles.bind(role, column);
        }
    }

    roles
}
