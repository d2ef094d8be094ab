//! Database Models - rows of the site's collections (used by sqlx/serde).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored text value that does not name a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum with `as_str`, `FromStr`-style parsing and
/// `TryFrom<String>` (used by `#[sqlx(try_from = "String")]`).
/// Exactly one variant must carry `#[default]`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal,
        { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::parse(&value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Account role, most privileged first.
    Role, "role", {
        SuperAdmin => "super_admin",
        Admin => "admin",
        Editor => "editor",
        #[default]
        Client => "client",
    }
);

impl Role {
    /// Roles allowed into the admin route group.
    pub const STAFF: &'static [Role] = &[Role::SuperAdmin, Role::Admin, Role::Editor];

    pub fn is_staff(&self) -> bool {
        Role::STAFF.contains(self)
    }

    /// Only admins may change other accounts' role or active flag.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

text_enum!(
    /// Publication state shared by projects and blog posts.
    PublishStatus, "publish status", {
        #[default]
        Draft => "draft",
        Published => "published",
        Archived => "archived",
    }
);

text_enum!(ContactStatus, "contact status", {
    #[default]
    New => "new",
    Read => "read",
    Replied => "replied",
    Archived => "archived",
});

text_enum!(SubscriptionStatus, "subscription status", {
    #[default]
    Active => "active",
    Unsubscribed => "unsubscribed",
});

/// Application-level user, mirrored from the identity provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub company_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user row; `role` falls back to the least privileged role.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<Role>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

/// Fields an admin may change on any account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccessUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Password credential kept by the local identity provider.
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

/// Name and colour of an item's category, as shown on listing cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub color: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            color: category.color.clone(),
        }
    }
}

/// Byline of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Portfolio entry. `description` and `content` hold sanitized HTML.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub gallery: Vec<String>,
    pub technologies: Vec<String>,
    pub client_name: Option<String>,
    pub project_url: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: PublishStatus,
    pub is_featured: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub client_name: Option<String>,
    pub project_url: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub status: Option<PublishStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
    pub client_name: Option<String>,
    pub project_url: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub status: Option<PublishStatus>,
    pub is_featured: Option<bool>,
}

/// Project with its category resolved, as listed and shown publicly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCard {
    #[serde(flatten)]
    pub project: Project,
    pub category: Option<CategorySummary>,
}

/// Blog article. `content` holds sanitized HTML.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub reading_time: i32,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Visible on the public blog at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == PublishStatus::Published
            && self.published_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Post with its category and author resolved, as listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: BlogPost,
    pub category: Option<CategorySummary>,
    pub author: Option<AuthorSummary>,
}

/// Blog post ready for insertion (already sanitized and measured).
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time: i32,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// Full replacement of a post's editable fields.
#[derive(Debug, Clone)]
pub struct BlogPostChanges {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub project_type: Option<String>,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub project_type: Option<String>,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    pub source: String,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: String,
    pub name: Option<String>,
    pub source: String,
}

/// Row counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub projects: i64,
    pub blog_posts: i64,
    pub users: i64,
    pub contacts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), *role);
        }
        assert!(Role::parse("owner").is_err());
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(PublishStatus::default(), PublishStatus::Draft);
        assert_eq!(ContactStatus::default(), ContactStatus::New);
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Active);
    }

    #[test]
    fn test_client_is_default_and_not_staff() {
        assert_eq!(Role::default(), Role::Client);
        assert!(!Role::Client.is_staff());
        assert!(Role::Editor.is_staff());
        assert!(!Role::Editor.can_manage_users());
        assert!(Role::SuperAdmin.can_manage_users());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
    }

    #[test]
    fn test_post_is_live_requires_past_publish_date() {
        let now = Utc::now();
        let mut post = BlogPost {
            id: Uuid::new_v4(),
            title: "Hello".into(),
            slug: "hello".into(),
            excerpt: None,
            content: None,
            featured_image: None,
            status: PublishStatus::Published,
            published_at: Some(now - chrono::Duration::hours(1)),
            view_count: 0,
            reading_time: 1,
            author_id: None,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(post.is_live(now));

        post.published_at = Some(now + chrono::Duration::hours(1));
        assert!(!post.is_live(now));

        post.published_at = None;
        assert!(!post.is_live(now));

        post.published_at = Some(now);
        post.status = PublishStatus::Draft;
        assert!(!post.is_live(now));
    }
}
