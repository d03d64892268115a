use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointment,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Appointment.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let name = name.trim();
    if name.is_empty() { return Err(errors::ModelError::Validation("name is required".into())); }
    if name.chars().count() > 100 { return Err(errors::ModelError::Validation("name must be at most 100 characters".into())); }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), errors::ModelError> {
    let phone = phone.trim();
    if phone.is_empty() { return Err(errors::ModelError::Validation("phone is required".into())); }
    if phone.chars().count() > 20 { return Err(errors::ModelError::Validation("phone must be at most 20 characters".into())); }
    Ok(())
}

/// Blank emails are stored as `None`.
pub fn normalize_email(email: Option<&str>) -> Result<Option<String>, errors::ModelError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        None => Ok(None),
        Some(e) if e.chars().count() > 100 => Err(errors::ModelError::Validation("email must be at most 100 characters".into())),
        Some(e) if !e.contains('@') => Err(errors::ModelError::Validation("invalid email".into())),
        Some(e) => Ok(Some(e.to_string())),
    }
}
