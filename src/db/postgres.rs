//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    BlogPost, BlogPostChanges, Category, ContactStatus, ContactSubmission, Credential,
    DashboardCounts, NewBlogPost, NewCategory, NewContactSubmission, NewProject, NewSubscription,
    NewUser, NewsletterSubscription, ProfileUpdate, Project, ProjectUpdate, PublishStatus,
    SubscriptionStatus, User, UserAccessUpdate,
};
use super::store::{Store, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, email, full_name, avatar_url, role, company_name, bio, website, \
     phone, is_active, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, title, slug, excerpt, description, content, featured_image, \
     gallery, technologies, client_name, project_url, completion_date, category_id, status, \
     is_featured, view_count, created_at, updated_at";

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, featured_image, status, \
     published_at, view_count, reading_time, author_id, category_id, created_at, updated_at";

const CONTACT_COLUMNS: &str = "id, name, email, phone, company, subject, message, project_type, \
     budget_range, timeline, status, created_at";

const SUBSCRIPTION_COLUMNS: &str =
    "id, email, name, status, source, subscribed_at, unsubscribed_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns unique-constraint violations into `StoreError::Duplicate`.
fn map_unique(what: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Duplicate(what.to_string()),
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<std::time::Duration> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, full_name, avatar_url, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.avatar_url)
        .bind(user.role.unwrap_or_default().as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique("user"))
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = $1, bio = $2, website = $3, phone = $4, company_name = $5,
                updated_at = now()
            WHERE id = $6
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&update.full_name)
        .bind(&update.bio)
        .bind(&update.website)
        .bind(&update.phone)
        .bind(&update.company_name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user_access(
        &self,
        id: Uuid,
        update: UserAccessUpdate,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = COALESCE($1, role), is_active = COALESCE($2, is_active), updated_at = now()
            WHERE id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM auth_credentials
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    async fn insert_credential(&self, credential: Credential) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_credentials (id, email, password_hash, full_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(credential.id)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(&credential.full_name)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique("credential"))?;
        Ok(())
    }

    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, color, is_active FROM categories WHERE is_active = true ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, color, is_active FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, slug, color)
            VALUES ($1, $2, COALESCE($3, '#3b82f6'))
            RETURNING id, name, slug, color, is_active
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.color)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique("category"))
    }

    async fn list_projects(&self, published_only: bool) -> StoreResult<Vec<Project>> {
        let projects = if published_only {
            sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE status = $1 \
                 ORDER BY is_featured DESC, created_at DESC"
            ))
            .bind(PublishStatus::Published.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };
        Ok(projects)
    }

    async fn get_project(&self, slug: &str) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn insert_project(&self, project: NewProject) -> StoreResult<Project> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (
                title, slug, excerpt, description, content, featured_image, gallery,
                technologies, client_name, project_url, completion_date, category_id,
                status, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&project.title)
        .bind(&project.slug)
        .bind(&project.excerpt)
        .bind(&project.description)
        .bind(&project.content)
        .bind(&project.featured_image)
        .bind(&project.gallery)
        .bind(&project.technologies)
        .bind(&project.client_name)
        .bind(&project.project_url)
        .bind(project.completion_date)
        .bind(project.category_id)
        .bind(project.status.unwrap_or_default().as_str())
        .bind(project.is_featured.unwrap_or(false))
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique("project slug"))
    }

    async fn update_project(
        &self,
        slug: &str,
        update: ProjectUpdate,
    ) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = COALESCE($1, title),
                excerpt = COALESCE($2, excerpt),
                description = COALESCE($3, description),
                content = COALESCE($4, content),
                featured_image = COALESCE($5, featured_image),
                gallery = COALESCE($6, gallery),
                technologies = COALESCE($7, technologies),
                client_name = COALESCE($8, client_name),
                project_url = COALESCE($9, project_url),
                completion_date = COALESCE($10, completion_date),
                category_id = COALESCE($11, category_id),
                status = COALESCE($12, status),
                is_featured = COALESCE($13, is_featured),
                updated_at = now()
            WHERE slug = $14
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&update.title)
        .bind(&update.excerpt)
        .bind(&update.description)
        .bind(&update.content)
        .bind(&update.featured_image)
        .bind(&update.gallery)
        .bind(&update.technologies)
        .bind(&update.client_name)
        .bind(&update.project_url)
        .bind(update.completion_date)
        .bind(update.category_id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.is_featured)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn record_project_view(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE projects SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_live_posts(&self, now: DateTime<Utc>) -> StoreResult<Vec<BlogPost>> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM blog_posts
            WHERE status = $1 AND published_at IS NOT NULL AND published_at <= $2
            ORDER BY published_at DESC
            "#
        ))
        .bind(PublishStatus::Published.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn get_post(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn insert_post(&self, post: NewBlogPost) -> StoreResult<BlogPost> {
        sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            INSERT INTO blog_posts
                (title, slug, excerpt, content, featured_image, status, published_at,
                 reading_time, author_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.featured_image)
        .bind(post.status.as_str())
        .bind(post.published_at)
        .bind(post.reading_time)
        .bind(post.author_id)
        .bind(post.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique("post slug"))
    }

    async fn update_post(
        &self,
        slug: &str,
        changes: BlogPostChanges,
    ) -> StoreResult<Option<BlogPost>> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            UPDATE blog_posts
            SET title = $1, excerpt = $2, content = $3, featured_image = $4, status = $5,
                published_at = $6, reading_time = $7, category_id = $8, updated_at = now()
            WHERE slug = $9
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&changes.title)
        .bind(&changes.excerpt)
        .bind(&changes.content)
        .bind(&changes.featured_image)
        .bind(changes.status.as_str())
        .bind(changes.published_at)
        .bind(changes.reading_time)
        .bind(changes.category_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, slug: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_post_view(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_contact(
        &self,
        contact: NewContactSubmission,
    ) -> StoreResult<ContactSubmission> {
        let row = sqlx::query_as::<_, ContactSubmission>(&format!(
            r#"
            INSERT INTO contact_submissions
                (name, email, phone, company, subject, message, project_type, budget_range,
                 timeline, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.company)
        .bind(&contact.subject)
        .bind(&contact.message)
        .bind(&contact.project_type)
        .bind(&contact.budget_range)
        .bind(&contact.timeline)
        .bind(ContactStatus::New.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>> {
        let contacts = sqlx::query_as::<_, ContactSubmission>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_submissions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>> {
        let contact = sqlx::query_as::<_, ContactSubmission>(&format!(
            "UPDATE contact_submissions SET status = $1 WHERE id = $2 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn find_subscription(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        let subscription = sqlx::query_as::<_, NewsletterSubscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM newsletter_subscriptions WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> StoreResult<NewsletterSubscription> {
        sqlx::query_as::<_, NewsletterSubscription>(&format!(
            r#"
            INSERT INTO newsletter_subscriptions (email, name, status, source)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(&subscription.email)
        .bind(&subscription.name)
        .bind(SubscriptionStatus::Active.as_str())
        .bind(&subscription.source)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique("subscription"))
    }

    async fn reactivate_subscription(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> StoreResult<NewsletterSubscription> {
        let subscription = sqlx::query_as::<_, NewsletterSubscription>(&format!(
            r#"
            UPDATE newsletter_subscriptions
            SET status = $1, name = $2, subscribed_at = now(), unsubscribed_at = NULL
            WHERE id = $3
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(SubscriptionStatus::Active.as_str())
        .bind(&name)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn unsubscribe(&self, id: Uuid) -> StoreResult<NewsletterSubscription> {
        let subscription = sqlx::query_as::<_, NewsletterSubscription>(&format!(
            r#"
            UPDATE newsletter_subscriptions
            SET status = $1, unsubscribed_at = now()
            WHERE id = $2
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(SubscriptionStatus::Unsubscribed.as_str())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let (projects, blog_posts, users, contacts): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects),
                (SELECT COUNT(*) FROM blog_posts),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM contact_submissions)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(DashboardCounts {
            projects,
            blog_posts,
            users,
            contacts,
        })
    }
}
