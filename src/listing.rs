//! In-memory filtering for the portfolio and blog grids, and the category and
//! author lookups that label their cards.

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::{
    AuthorSummary, BlogPost, CategorySummary, PostCard, Project, ProjectCard,
};
use crate::db::{Store, StoreResult};

/// Shown when a filtered listing comes back empty.
pub const EMPTY_PROJECTS_MESSAGE: &str = "No projects found";
pub const EMPTY_POSTS_MESSAGE: &str = "No posts found";

/// `?search=&category=` query of the public listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "category_param")]
    pub category: Option<Uuid>,
}

/// `category=` and `category=all` mean "every category".
fn category_param<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl ListingFilter {
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// True when neither a search term nor a category narrows the listing.
    pub fn is_empty(&self) -> bool {
        self.needle().is_none() && self.category.is_none()
    }

    pub fn matches<T: Listable>(&self, item: &T) -> bool {
        let category_ok = match self.category {
            Some(id) => item.category_id() == Some(id),
            None => true,
        };
        if !category_ok {
            return false;
        }

        match self.needle() {
            None => true,
            Some(needle) => [Some(item.title()), item.excerpt(), item.client_name()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle)),
        }
    }

    /// Keeps the items that match, preserving their order.
    pub fn apply<T: Listable>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Something that can appear in a filterable grid.
pub trait Listable {
    fn title(&self) -> &str;
    fn excerpt(&self) -> Option<&str>;
    fn client_name(&self) -> Option<&str>;
    fn category_id(&self) -> Option<Uuid>;
}

impl Listable for Project {
    fn title(&self) -> &str {
        &self.title
    }

    fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

impl Listable for BlogPost {
    fn title(&self) -> &str {
        &self.title
    }

    fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    // posts have no client
    fn client_name(&self) -> Option<&str> {
        None
    }

    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

/// Category and author summaries for a batch of listed items.
#[derive(Debug, Default)]
pub struct Relations {
    categories: HashMap<Uuid, CategorySummary>,
    authors: HashMap<Uuid, AuthorSummary>,
}

impl Relations {
    /// Categories only; projects have no author.
    pub async fn for_projects(store: &dyn Store, projects: &[Project]) -> StoreResult<Self> {
        let mut relations = Relations::default();
        if projects.iter().any(|p| p.category_id.is_some()) {
            relations.load_categories(store).await?;
        }
        Ok(relations)
    }

    pub async fn for_posts(store: &dyn Store, posts: &[BlogPost]) -> StoreResult<Self> {
        let mut relations = Relations::default();
        if posts.iter().any(|p| p.category_id.is_some()) {
            relations.load_categories(store).await?;
        }
        for author_id in posts.iter().filter_map(|p| p.author_id) {
            if relations.authors.contains_key(&author_id) {
                continue;
            }
            // deleted authors simply lose their byline
            if let Some(user) = store.get_user(author_id).await? {
                relations.authors.insert(author_id, AuthorSummary::from(&user));
            }
        }
        Ok(relations)
    }

    async fn load_categories(&mut self, store: &dyn Store) -> StoreResult<()> {
        self.categories = store
            .list_categories()
            .await?
            .iter()
            .map(|c| (c.id, CategorySummary::from(c)))
            .collect();
        Ok(())
    }

    fn category(&self, id: Option<Uuid>) -> Option<CategorySummary> {
        id.and_then(|id| self.categories.get(&id)).cloned()
    }

    pub fn project_card(&self, project: Project) -> ProjectCard {
        ProjectCard {
            category: self.category(project.category_id),
            project,
        }
    }

    pub fn post_card(&self, post: BlogPost) -> PostCard {
        PostCard {
            category: self.category(post.category_id),
            author: post.author_id.and_then(|id| self.authors.get(&id)).cloned(),
            post,
        }
    }

    pub fn project_cards(&self, projects: Vec<Project>) -> Vec<ProjectCard> {
        projects.into_iter().map(|p| self.project_card(p)).collect()
    }

    pub fn post_cards(&self, posts: Vec<BlogPost>) -> Vec<PostCard> {
        posts.into_iter().map(|p| self.post_card(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PublishStatus;
    use chrono::Utc;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn project(title: &str, excerpt: Option<&str>, client: Option<&str>, cat: Option<Uuid>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            excerpt: excerpt.map(str::to_string),
            description: None,
            content: None,
            featured_image: None,
            gallery: Vec::new(),
            technologies: Vec::new(),
            client_name: client.map(str::to_string),
            project_url: None,
            completion_date: None,
            category_id: cat,
            status: PublishStatus::Published,
            is_featured: false,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let items = vec![
            project("Retail analytics", None, None, None),
            project("Fraud model", None, None, Some(Uuid::new_v4())),
        ];
        let filter = ListingFilter {
            search: Some("   ".to_string()),
            category: None,
        };
        assert!(filter.is_empty());
        assert_eq!(filter.apply(items).len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let items = vec![
            project("Retail analytics", None, None, None),
            project("Fraud model", Some("Realtime SCORING"), None, None),
            project("Chatbot", None, Some("Acme Scoring Ltd"), None),
            project("Warehouse", None, None, None),
        ];
        let filter = ListingFilter {
            search: Some("scoring".to_string()),
            category: None,
        };
        let titles: Vec<_> = filter.apply(items).into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Fraud model", "Chatbot"]);
    }

    #[test]
    fn test_category_and_search_must_both_hold() {
        let ml = Uuid::new_v4();
        let items = vec![
            project("Vision pipeline", None, None, Some(ml)),
            project("Vision audit", None, None, Some(Uuid::new_v4())),
            project("Forecasting", None, None, Some(ml)),
        ];
        let filter = ListingFilter {
            search: Some("vision".to_string()),
            category: Some(ml),
        };
        let result = filter.apply(items);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Vision pipeline");
    }

    #[test]
    fn test_filtered_set_is_subset_and_every_item_matches() {
        let mut rng = StdRng::seed_from_u64(7);
        let categories: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let words = ["cloud", "data", "vision", "retail", "bank"];

        for _ in 0..50 {
            let items: Vec<Project> = (0..20)
                .map(|i| {
                    let word = words[rng.random_range(0..words.len())];
                    let cat = if rng.random_bool(0.8) {
                        Some(categories[rng.random_range(0..categories.len())])
                    } else {
                        None
                    };
                    project(&format!("{} project {}", word, i), None, None, cat)
                })
                .collect();

            let filter = ListingFilter {
                search: Some(words[rng.random_range(0..words.len())].to_uppercase()),
                category: if rng.random_bool(0.5) {
                    Some(categories[rng.random_range(0..categories.len())])
                } else {
                    None
                },
            };

            let ids: Vec<Uuid> = items.iter().map(|p| p.id).collect();
            let result = filter.apply(items);
            for item in &result {
                assert!(ids.contains(&item.id));
                assert!(filter.matches(item));
            }
        }
    }

    #[test]
    fn test_category_param_accepts_blank_and_all() {
        let blank: ListingFilter = serde_json::from_str(r#"{"category": ""}"#).unwrap();
        assert!(blank.category.is_none());
        let all: ListingFilter = serde_json::from_str(r#"{"category": "all"}"#).unwrap();
        assert!(all.category.is_none());
        let id = Uuid::new_v4();
        let one: ListingFilter =
            serde_json::from_str(&format!(r#"{{"category": "{}"}}"#, id)).unwrap();
        assert_eq!(one.category, Some(id));
    }

    #[test]
    fn test_posts_never_match_on_client_name() {
        let now = Utc::now();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: "Quarterly notes".into(),
            slug: "quarterly-notes".into(),
            excerpt: Some("What we shipped".into()),
            content: None,
            featured_image: None,
            status: PublishStatus::Published,
            published_at: Some(now),
            view_count: 0,
            reading_time: 1,
            author_id: None,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        let hit = ListingFilter {
            search: Some("shipped".into()),
            category: None,
        };
        let miss = ListingFilter {
            search: Some("acme".into()),
            category: None,
        };
        assert!(hit.matches(&post));
        assert!(!miss.matches(&post));
    }

    #[tokio::test]
    async fn test_relations_label_posts_with_category_and_author() {
        use crate::db::models::{NewCategory, NewUser};
        use crate::db::MemoryStore;

        let store = MemoryStore::new();
        let news = store
            .insert_category(NewCategory {
                name: "News".into(),
                slug: "news".into(),
                color: Some("#F59E0B".into()),
            })
            .await
            .unwrap();
        let author = store
            .insert_user(NewUser {
                id: Uuid::new_v4(),
                email: "writer@example.com".into(),
                full_name: Some("Wren Writer".into()),
                avatar_url: Some("/wren.png".into()),
                role: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let post = |author_id, category_id| BlogPost {
            id: Uuid::new_v4(),
            title: "Launch".into(),
            slug: "launch".into(),
            excerpt: None,
            content: None,
            featured_image: None,
            status: PublishStatus::Published,
            published_at: Some(now),
            view_count: 0,
            reading_time: 1,
            author_id,
            category_id,
            created_at: now,
            updated_at: now,
        };
        let posts = vec![
            post(Some(author.id), Some(news.id)),
            post(Some(Uuid::new_v4()), None),
        ];

        let relations = Relations::for_posts(&store, &posts).await.unwrap();
        let cards = relations.post_cards(posts);
        assert_eq!(
            cards[0].category,
            Some(CategorySummary {
                name: "News".into(),
                color: "#F59E0B".into()
            })
        );
        assert_eq!(
            cards[0].author.as_ref().and_then(|a| a.full_name.as_deref()),
            Some("Wren Writer")
        );
        assert!(cards[1].category.is_none());
        assert!(cards[1].author.is_none());
    }
}
