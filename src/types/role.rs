//! Caller roles carried in the principal header.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// A role held by a principal.
///
/// `Admin` principals receive a blanket `Manage` grant on every subject when
/// an ability is compiled for them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    Admin,
    User,
    Manager,
}
