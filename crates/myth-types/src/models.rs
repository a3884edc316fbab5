use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a string-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(
    /// Verification state of a myth.
    MythStatus, "myth status" {
        Pending => "pending",
        UnderReview => "under_review",
        Verified => "verified",
        Debunked => "debunked",
        Inconclusive => "inconclusive",
    }
);

string_enum!(
    VoteType, "vote type" {
        Upvote => "upvote",
        Downvote => "downvote",
    }
);

string_enum!(
    /// Lifecycle of a research request. `Completed` and `Rejected` are terminal.
    ResearchStatus, "research status" {
        Open => "open",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
    }
);

string_enum!(
    EvidenceType, "evidence type" {
        ScientificStudy => "scientific_study",
        ExpertOpinion => "expert_opinion",
        FieldTrial => "field_trial",
        TraditionalKnowledge => "traditional_knowledge",
        Other => "other",
    }
);

string_enum!(
    NotificationType, "notification type" {
        MythUpdate => "myth_update",
        NewComment => "new_comment",
        EvidenceAdded => "evidence_added",
        ResearchUpdate => "research_update",
        StatusChange => "status_change",
    }
);

string_enum!(
    /// Kind of record a vote can target.
    SubjectKind, "content type" {
        Myth => "myth",
        Evidence => "evidence",
    }
);

impl Default for MythStatus {
    fn default() -> Self {
        MythStatus::Pending
    }
}

impl Default for EvidenceType {
    fn default() -> Self {
        EvidenceType::Other
    }
}

/// The record a vote points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteSubject {
    Myth(i64),
    Evidence(i64),
}

impl VoteSubject {
    pub fn new(kind: SubjectKind, id: i64) -> Self {
        match kind {
            SubjectKind::Myth => VoteSubject::Myth(id),
            SubjectKind::Evidence => VoteSubject::Evidence(id),
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            VoteSubject::Myth(_) => SubjectKind::Myth,
            VoteSubject::Evidence(_) => SubjectKind::Evidence,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            VoteSubject::Myth(id) | VoteSubject::Evidence(id) => *id,
        }
    }
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_farmer: bool,
    pub is_researcher: bool,
    pub is_staff: bool,
    pub phone_number: String,
    pub bio: String,
    pub location: String,
    pub preferred_language: String,
    pub created_at: DateTime<Utc>,
}

/// Compact user reference embedded in other records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// -- Catalogue --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized vote counters carried by every votable record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub total_votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Myth {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub origin: String,
    pub category: Option<Category>,
    pub submitted_by: Option<UserSummary>,
    pub status: MythStatus,
    pub is_featured: bool,
    #[serde(flatten)]
    pub tally: Tally,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: i64,
    pub myth_id: i64,
    pub title: String,
    pub description: String,
    pub evidence_type: EvidenceType,
    pub source_url: String,
    pub source_citation: String,
    pub submitted_by: Option<UserSummary>,
    pub is_approved: bool,
    #[serde(flatten)]
    pub tally: Tally,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub myth_id: i64,
    pub user: UserSummary,
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub content_type: SubjectKind,
    pub object_id: i64,
    pub user_id: i64,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub id: i64,
    pub myth_id: i64,
    pub requested_by: UserSummary,
    pub assigned_to: Option<UserSummary>,
    pub status: ResearchStatus,
    pub description: String,
    pub findings: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_myth: Option<i64>,
    pub created_at: DateTime<Utc>,
}
