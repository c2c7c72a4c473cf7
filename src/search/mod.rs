//! Tantivy-based search index module.
//!
//! Full-text search over published posts, with titles weighted above bodies.
//! The index is derived data: it is rebuilt from the database at startup and
//! kept current by the post handlers on a best-effort basis.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Post, PostStatus};

const BOOST_TITLE: f32 = 3.0;
const BOOST_CONTENT: f32 = 1.0;

/// Largest page a single search may return.
pub const MAX_SEARCH_LIMIT: usize = 100;
/// Deepest offset a search may page to. The collector keeps `limit + offset` hits in memory.
pub const MAX_SEARCH_OFFSET: usize = 10_000;

/// Search hit with post id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub post_id: String,
    pub score: f32,
}

/// One page of hits plus the number of indexed documents that matched.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

struct SearchFields {
    post_id: Field,
    title: Field,
    content: Field,
}

/// Tantivy search index for posts.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        // post_id must be indexed (STRING) for delete_term to find it
        let mut schema_builder = Schema::builder();
        let post_id = schema_builder.add_text_field("post_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let content = schema_builder.add_text_field("content", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            post_id,
            title,
            content,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the index contents with the given posts.
    pub async fn rebuild(&self, posts: &[Post]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        let mut indexed = 0usize;
        for post in posts.iter().filter(|p| p.status == PostStatus::Published) {
            writer.add_document(self.create_document(post))?;
            indexed += 1;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} posts", indexed);
        Ok(())
    }

    /// Index or re-index a post. Posts that are not published are removed.
    pub async fn index_post(&self, post: &Post) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.post_id, &post.id));
        if post.status == PostStatus::Published {
            writer.add_document(self.create_document(post))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a post from the index.
    pub async fn remove_post(&self, post_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.post_id, post_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for posts matching the query, best match first.
    ///
    /// `limit` is clamped to `1..=MAX_SEARCH_LIMIT`; an offset past `MAX_SEARCH_OFFSET` is rejected.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<SearchHits, AppError> {
        if offset > MAX_SEARCH_OFFSET {
            return Err(AppError::Validation(format!(
                "offset must be at most {}",
                MAX_SEARCH_OFFSET
            )));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        if query_str.trim().is_empty() {
            return Ok(SearchHits::default());
        }

        let searcher = self.reader.searcher();

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in [
            (self.fields.title, BOOST_TITLE),
            (self.fields.content, BOOST_CONTENT),
        ] {
            let mut field_parser = QueryParser::for_index(&self.index, vec![field]);
            field_parser.set_conjunction_by_default();
            // Lenient parsing so stray quotes or colons still match something
            let (field_query, _errors) = field_parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let query = BooleanQuery::new(subqueries);

        let top = TopDocs::with_limit(limit + offset);
        let (top_docs, total) = searcher
            .search(&query, &(top, Count))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let post_id = doc.get_first(self.fields.post_id)?.as_str()?.to_string();
                Some(SearchResult { post_id, score })
            })
            .collect();

        Ok(SearchHits { results, total })
    }

    fn create_document(&self, post: &Post) -> TantivyDocument {
        doc!(
            self.fields.post_id => post.id.clone(),
            self.fields.title => post.title.clone(),
            self.fields.content => post.content.clone()
        )
    }
}
