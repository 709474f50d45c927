use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::entities::NewArticle;
use crate::infrastructure::database::schema::articles;

#[derive(Debug, Insertable)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewArticleModel<'a> {
    pub author: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub publish_date: DateTime<Utc>,
    pub content_hash: &'a str,
    pub metadata: serde_json::Value,
}

impl<'a> From<&'a NewArticle> for NewArticleModel<'a> {
    fn from(article: &'a NewArticle) -> Self {
        Self {
            author: article.author(),
            title: article.title(),
            content: article.content(),
            publish_date: article.publish_date(),
            content_hash: article.content_hash().as_str(),
            metadata: article.metadata_json(),
        }
    }
}
