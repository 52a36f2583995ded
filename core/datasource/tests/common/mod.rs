//! FILENAME: tests/common/mod.rs
//! Fixtures for datasource integration tests.

#![allow(dead_code)]

use datasource::RowStore;

/// Employee records as a JSON array. `__id` is caller bookkeeping and
/// never becomes a column.
pub const EMPLOYEES_JSON: &str = r#"[
    { "__id": 1, "firstName": "Alice", "dept": "Eng",   "salary": 75000, "active": true },
    { "__id": 2, "firstName": "Bob",   "dept": "Sales", "salary": 65000, "active": true },
    { "__id": 3, "firstName": "Carol", "dept": "Eng",   "salary": 85000, "active": false },
    { "__id": 4, "firstName": "Dan",   "dept": "Ops",   "salary": null,  "active": true }
]"#;

pub fn employees() -> RowStore {
    RowStore::from_json(EMPLOYEES_JSON).expect("fixture parses")
}
