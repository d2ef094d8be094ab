//! In-memory store, used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    BlogPost, BlogPostChanges, Category, ContactStatus, ContactSubmission, Credential,
    DashboardCounts, NewBlogPost, NewCategory, NewContactSubmission, NewProject, NewSubscription,
    NewUser, NewsletterSubscription, ProfileUpdate, Project, ProjectUpdate, PublishStatus,
    SubscriptionStatus, User, UserAccessUpdate,
};
use super::store::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    credentials: Vec<Credential>,
    categories: Vec<Category>,
    projects: Vec<Project>,
    posts: Vec<BlogPost>,
    contacts: Vec<ContactSubmission>,
    subscriptions: Vec<NewsletterSubscription>,
}

/// Rows live for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<std::time::Duration> {
        let start = std::time::Instant::now();
        let _tables = self.tables.read().await;
        Ok(start.elapsed())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate("user".to_string()));
        }
        let now = Utc::now();
        let row = User {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            role: user.role.unwrap_or_default(),
            company_name: None,
            bio: None,
            website: None,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.full_name = update.full_name;
        user.bio = update.bio;
        user.website = update.website;
        user.phone = update.phone;
        user.company_name = update.company_name;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_user_access(
        &self,
        id: Uuid,
        update: UserAccessUpdate,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users = self.tables.read().await.users.clone();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>> {
        let tables = self.tables.read().await;
        Ok(tables
            .credentials
            .iter()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_credential(&self, credential: Credential) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .credentials
            .iter()
            .any(|c| c.email.eq_ignore_ascii_case(&credential.email))
        {
            return Err(StoreError::Duplicate("credential".to_string()));
        }
        tables.credentials.push(credential);
        Ok(())
    }

    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.iter().any(|c| c.slug == category.slug) {
            return Err(StoreError::Duplicate("category".to_string()));
        }
        let row = Category {
            id: Uuid::new_v4(),
            name: category.name,
            slug: category.slug,
            color: category.color.unwrap_or_else(|| "#3b82f6".to_string()),
            is_active: true,
        };
        tables.categories.push(row.clone());
        Ok(row)
    }

    async fn list_projects(&self, published_only: bool) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .iter()
            .filter(|p| !published_only || p.status == PublishStatus::Published)
            .cloned()
            .collect();
        newest_first(&mut projects, |p| p.created_at);
        if published_only {
            // stable sort keeps newest-first inside each group
            projects.sort_by_key(|p| !p.is_featured);
        }
        Ok(projects)
    }

    async fn get_project(&self, slug: &str) -> StoreResult<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().find(|p| p.slug == slug).cloned())
    }

    async fn insert_project(&self, project: NewProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        if tables.projects.iter().any(|p| p.slug == project.slug) {
            return Err(StoreError::Duplicate("project slug".to_string()));
        }
        let now = Utc::now();
        let row = Project {
            id: Uuid::new_v4(),
            title: project.title,
            slug: project.slug,
            excerpt: project.excerpt,
            description: project.description,
            content: project.content,
            featured_image: project.featured_image,
            gallery: project.gallery,
            technologies: project.technologies,
            client_name: project.client_name,
            project_url: project.project_url,
            completion_date: project.completion_date,
            category_id: project.category_id,
            status: project.status.unwrap_or_default(),
            is_featured: project.is_featured.unwrap_or(false),
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(row.clone());
        Ok(row)
    }

    async fn update_project(
        &self,
        slug: &str,
        update: ProjectUpdate,
    ) -> StoreResult<Option<Project>> {
        let mut tables = self.tables.write().await;
        let Some(project) = tables.projects.iter_mut().find(|p| p.slug == slug) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            project.title = title;
        }
        if update.excerpt.is_some() {
            project.excerpt = update.excerpt;
        }
        if update.description.is_some() {
            project.description = update.description;
        }
        if update.content.is_some() {
            project.content = update.content;
        }
        if update.featured_image.is_some() {
            project.featured_image = update.featured_image;
        }
        if let Some(gallery) = update.gallery {
            project.gallery = gallery;
        }
        if let Some(technologies) = update.technologies {
            project.technologies = technologies;
        }
        if update.client_name.is_some() {
            project.client_name = update.client_name;
        }
        if update.project_url.is_some() {
            project.project_url = update.project_url;
        }
        if update.completion_date.is_some() {
            project.completion_date = update.completion_date;
        }
        if update.category_id.is_some() {
            project.category_id = update.category_id;
        }
        if let Some(status) = update.status {
            project.status = status;
        }
        if let Some(featured) = update.is_featured {
            project.is_featured = featured;
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn list_live_posts(&self, now: DateTime<Utc>) -> StoreResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<BlogPost> = tables
            .posts
            .iter()
            .filter(|p| p.is_live(now))
            .cloned()
            .collect();
        newest_first(&mut posts, |p| p.published_at.unwrap_or(p.created_at));
        Ok(posts)
    }

    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let mut posts = self.tables.read().await.posts.clone();
        newest_first(&mut posts, |p| p.created_at);
        Ok(posts)
    }

    async fn get_post(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn insert_post(&self, post: NewBlogPost) -> StoreResult<BlogPost> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.slug == post.slug) {
            return Err(StoreError::Duplicate("post slug".to_string()));
        }
        let now = Utc::now();
        let row = BlogPost {
            id: Uuid::new_v4(),
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            content: post.content,
            featured_image: post.featured_image,
            status: post.status,
            published_at: post.published_at,
            view_count: 0,
            reading_time: post.reading_time,
            author_id: post.author_id,
            category_id: post.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(row.clone());
        Ok(row)
    }

    async fn update_post(
        &self,
        slug: &str,
        changes: BlogPostChanges,
    ) -> StoreResult<Option<BlogPost>> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.iter_mut().find(|p| p.slug == slug) else {
            return Ok(None);
        };
        post.title = changes.title;
        post.excerpt = changes.excerpt;
        post.content = changes.content;
        post.featured_image = changes.featured_image;
        post.status = changes.status;
        post.published_at = changes.published_at;
        post.reading_time = changes.reading_time;
        post.category_id = changes.category_id;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, slug: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.slug != slug);
        Ok(tables.posts.len() != before)
    }

    async fn record_project_view(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(project) = tables.projects.iter_mut().find(|p| p.id == id) {
            project.view_count += 1;
        }
        Ok(())
    }

    async fn record_post_view(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) {
            post.view_count += 1;
        }
        Ok(())
    }

    async fn insert_contact(
        &self,
        contact: NewContactSubmission,
    ) -> StoreResult<ContactSubmission> {
        let row = ContactSubmission {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            subject: contact.subject,
            message: contact.message,
            project_type: contact.project_type,
            budget_range: contact.budget_range,
            timeline: contact.timeline,
            status: ContactStatus::New,
            created_at: Utc::now(),
        };
        self.tables.write().await.contacts.push(row.clone());
        Ok(row)
    }

    async fn list_contacts(&self) -> StoreResult<Vec<ContactSubmission>> {
        let mut contacts = self.tables.read().await.contacts.clone();
        newest_first(&mut contacts, |c| c.created_at);
        Ok(contacts)
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> StoreResult<Option<ContactSubmission>> {
        let mut tables = self.tables.write().await;
        let Some(contact) = tables.contacts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        contact.status = status;
        Ok(Some(contact.clone()))
    }

    async fn find_subscription(
        &self,
        email: &str,
    ) -> StoreResult<Option<NewsletterSubscription>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> StoreResult<NewsletterSubscription> {
        let mut tables = self.tables.write().await;
        if tables
            .subscriptions
            .iter()
            .any(|s| s.email == subscription.email)
        {
            return Err(StoreError::Duplicate("subscription".to_string()));
        }
        let row = NewsletterSubscription {
            id: Uuid::new_v4(),
            email: subscription.email,
            name: subscription.name,
            status: SubscriptionStatus::Active,
            source: subscription.source,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        tables.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn reactivate_subscription(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> StoreResult<NewsletterSubscription> {
        let mut tables = self.tables.write().await;
        let subscription = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        subscription.status = SubscriptionStatus::Active;
        subscription.name = name;
        subscription.subscribed_at = Utc::now();
        subscription.unsubscribed_at = None;
        Ok(subscription.clone())
    }

    async fn unsubscribe(&self, id: Uuid) -> StoreResult<NewsletterSubscription> {
        let mut tables = self.tables.write().await;
        let subscription = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        subscription.status = SubscriptionStatus::Unsubscribed;
        subscription.unsubscribed_at = Some(Utc::now());
        Ok(subscription.clone())
    }

    async fn dashboard_counts(&self) -> StoreResult<DashboardCounts> {
        let tables = self.tables.read().await;
        Ok(DashboardCounts {
            projects: tables.projects.len() as i64,
            blog_posts: tables.posts.len() as i64,
            users: tables.users.len() as i64,
            contacts: tables.contacts.len() as i64,
        })
    }
}
