//! Inputs and row types that belong to the storage layer only.
//! API-facing records live in `myth_types::models`.

use myth_types::models::{
    EvidenceType, MythStatus, NotificationType, ResearchStatus, SubjectKind, User, VoteType,
};

use crate::filter::Page;

/// A user together with the stored Argon2 hash. Never serialized.
pub struct UserRow {
    pub user: User,
    pub password_hash: String,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub is_farmer: bool,
    pub is_researcher: bool,
}

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_farmer: Option<bool>,
    pub is_researcher: Option<bool>,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferred_language: Option<String>,
}

#[derive(Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Default)]
pub struct MythChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<i64>>,
    pub status: Option<MythStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default)]
pub struct EvidenceChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub evidence_type: Option<EvidenceType>,
    pub source_url: Option<String>,
    pub source_citation: Option<String>,
    pub is_approved: Option<bool>,
}

pub struct NewEvidence<'a> {
    pub myth_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub evidence_type: EvidenceType,
    pub source_url: &'a str,
    pub source_citation: &'a str,
}

pub struct NewNotification {
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_myth: Option<i64>,
}

// -- List filters --

#[derive(Debug, Default)]
pub struct MythFilter {
    pub status: Option<MythStatus>,
    pub is_featured: Option<bool>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub submitted_by: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Page,
}

#[derive(Debug, Default)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Default)]
pub struct EvidenceFilter {
    pub myth_id: Option<i64>,
    pub evidence_type: Option<EvidenceType>,
    pub is_approved: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Page,
}

#[derive(Debug, Default)]
pub struct CommentFilter {
    pub myth_id: Option<i64>,
    pub user_id: Option<i64>,
    pub is_approved: Option<bool>,
    pub ordering: Option<String>,
    pub page: Page,
}

#[derive(Debug, Default)]
pub struct VoteFilter {
    pub vote_type: Option<VoteType>,
    pub content_type: Option<SubjectKind>,
    pub object_id: Option<i64>,
    pub page: Page,
}

/// Who is asking, for row-level visibility of research requests.
#[derive(Debug, Clone, Copy)]
pub enum ResearchScope {
    /// Staff: everything.
    All,
    /// Researchers: assigned to or requested by this user.
    AssignedOrRequested(i64),
    /// Everyone else: requested by this user.
    RequestedBy(i64),
}

#[derive(Debug, Default)]
pub struct ResearchFilter {
    pub status: Option<ResearchStatus>,
    pub myth_id: Option<i64>,
    pub requested_by: Option<i64>,
    pub assigned_to: Option<i64>,
    pub ordering: Option<String>,
    pub page: Page,
}

#[derive(Debug, Default)]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    pub page: Page,
}
