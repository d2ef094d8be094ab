//! Store trait: the row-level operations the site performs on its collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    BlogPost, BlogPostChanges, Category, ContactStatus, ContactSubmission, Credential,
    DashboardCounts, NewBlogPost, NewCategory, NewContactSubmission, NewProject, NewSubscription,
    NewUser, NewsletterSubscription, ProfileUpdate, Project, ProjectUpdate, User,
    UserAccessUpdate,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate email, slug, ...).
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("store is not configured")]
    NotConfigured,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip latency to the backing store.
    async fn ping(&self) -> StoreResult<std::time::Duration>;

    /// Short name for logs and health output.
    fn backend(&self) -> &'static str;

    // users
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>>;
    async fn update_user_access(
        &self,
        id: Uuid,
        update: UserAccessUpdate,
    ) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    // credentials (local identity provider)
    async fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>>;
    async fn insert_credential(&self, credential: Credential) -> StoreResult<()>;

    // categories
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>>;
    /// Every category, inactive ones included; used to label listed items.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category>;

    // projects
    async fn list_projects(&self, published_only: bool) -> StoreResult<Vec<Project>>;
    async fn get_project(&self, slug: &str) -> StoreResult<Option<Project>>;
    async fn insert_project(&self, project: NewProject) -> StoreResult<Project>;
    async fn update_project(
        &self,
        slug: &str,
        update: ProjectUpdate,
    ) -> StoreResult<Option<Project>>;
    async fn record_project_view(&self, id: Uuid) -> StoreResult<()>;

    // blog posts
    /// Published posts whose publish date is at or before `now`, newest first.
    async fn list_live_posts(&self, now: DateTime<Utc>) -> StoreResult<Vec<BlogPost>>;
    /// Every post regardless of status, newest first.
    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>>;
    async fn get_post(&self, slug: &str) -> StoreResult<Option<BlogPost>>;
    async fn insert_post(&self, post: NewBlogPost) -> StoreResult<BlogPost>;
    async fn update_post(
        &self,
        slug: &str,
        changes: BlogPostChanges,
    ) -> StoreResult<Option<BlogPost>>;
    async fn delete_post(&self, slug: &str) -> StoreResult<bool>;
    async fn record_post_view(&self, id: Uuid) -> StoreResult<()>;

    // contact submissions
    async fn insert_contact(&self, contact: NewContactSubmission)
        -> StoreResult<ContactSubmission>;
    async fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>>;
    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>>;

    // newsletter
    async fn find_subscription(&self, email: &str)
        -> StoreResult<Option<NewsletterSubscription>>;
    async fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> StoreResult<NewsletterSubscription>;
    /// Marks an existing subscription active again, replacing its name.
    async fn reactivate_subscription(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> StoreResult<NewsletterSubscription>;
    async fn unsubscribe(&self, id: Uuid) -> StoreResult<NewsletterSubscription>;

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts>;
}
