use serde::Deserialize;

/// Main configuration structure for Biblio-Harvest
///
/// Every section and key has a default, so an empty file is a valid
/// configuration that reproduces the stock collection run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
}

/// Settings shared by both HTTP sources
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent to the catalog site
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Connect timeout in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// JSON volumes API collection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Volumes search endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Optional API key; blank means anonymous access
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,

    /// Items requested per page (`maxResults`)
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Stop paginating a query once the cursor reaches this offset
    #[serde(rename = "max-per-query")]
    pub max_per_query: u32,

    /// Maximum page requests per query
    #[serde(rename = "max-requests")]
    pub max_requests: u32,

    /// Stop after this many consecutive pages that admit nothing new (unset = never)
    #[serde(rename = "max-stale-pages")]
    pub max_stale_pages: Option<u32>,

    /// Stop the whole run once this many records are held (unset = no limit)
    #[serde(rename = "target-total")]
    pub target_total: Option<u32>,

    /// Retries allowed for HTTP 429 responses
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base wait before the first 429 retry, doubled on each further retry
    #[serde(rename = "rate-limit-backoff-secs")]
    pub rate_limit_backoff_secs: u64,

    /// Request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Delay between pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Delay between queries (milliseconds)
    #[serde(rename = "query-delay-ms")]
    pub query_delay_ms: u64,

    /// Checkpoint and final output file
    #[serde(rename = "output-path")]
    pub output_path: String,

    /// Search queries, consumed in order
    pub queries: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1/volumes".to_string(),
            api_key: None,
            page_size: 40,
            max_per_query: 300,
            max_requests: 500,
            max_stale_pages: None,
            target_total: None,
            max_retries: 3,
            rate_limit_backoff_secs: 60,
            timeout_secs: 30,
            page_delay_ms: 1000,
            query_delay_ms: 2000,
            output_path: "data/google_books_api.csv".to_string(),
            queries: [
                "fiction",
                "science fiction",
                "mystery",
                "romance",
                "thriller",
                "biography",
                "history",
                "philosophy",
                "programming",
                "art",
                "novel",
                "drama",
                "adventure",
                "fantasy",
                "horror",
                "poetry",
                "essay",
                "children",
                "young adult",
                "classic",
                "contemporary",
                "literary",
                "nonfiction",
                "memoir",
                "self-help",
                "business",
                "economics",
                "psychology",
                "sociology",
                "politics",
            ]
            .iter()
            .map(|q| q.to_string())
            .collect(),
        }
    }
}

/// HTML catalog collection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Site root; detail links are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search endpoint path below the site root
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Stop the whole run once this many records are held
    #[serde(rename = "target-total")]
    pub target_total: Option<u32>,

    /// Stop paginating a category once the cursor reaches this offset
    #[serde(rename = "max-offset")]
    pub max_offset: u32,

    /// Maximum page requests per category
    #[serde(rename = "max-requests")]
    pub max_requests: u32,

    /// Stop after this many consecutive pages that admit nothing new (unset = never)
    #[serde(rename = "max-stale-pages")]
    pub max_stale_pages: Option<u32>,

    /// Retries allowed for a failing page
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Delay between pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Delay between categories (milliseconds)
    #[serde(rename = "category-delay-ms")]
    pub category_delay_ms: u64,

    /// Visit each new record's detail page to fill in more fields
    #[serde(rename = "fetch-details")]
    pub fetch_details: bool,

    /// Checkpoint and final output file
    #[serde(rename = "output-path")]
    pub output_path: String,

    /// Search categories, consumed in order
    pub categories: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.gutenberg.org".to_string(),
            search_path: "/ebooks/search/".to_string(),
            target_total: Some(10_000),
            max_offset: 10_000,
            max_requests: 500,
            max_stale_pages: Some(5),
            max_retries: 3,
            timeout_secs: 30,
            page_delay_ms: 300,
            category_delay_ms: 1000,
            fetch_details: false,
            output_path: "data/project_gutenberg.csv".to_string(),
            categories: [
                "Adventure",
                "American Literature",
                "British Literature",
                "French Literature",
                "German Literature",
                "Russian Literature",
                "Classics of Literature",
                "Biographies",
                "Novels",
                "Short Stories",
                "Poetry",
                "Plays/Films/Dramas",
                "Romance",
                "Science-Fiction & Fantasy",
                "Crime",
                "Thrillers & Mystery",
                "Mythology",
                "History - American",
                "History - British",
                "History - European",
                "History - Ancient",
                "History - Medieval/Middle Ages",
                "History - Modern",
                "Art",
                "Architecture",
                "Music",
                "Religion/Spirituality",
                "Philosophy & Ethics",
                "Cooking & Drinking",
                "Sports/Hobbies",
                "Travel Writing",
                "Health & Medicine",
                "Mathematics",
                "Science - Physics",
                "Science - Chemistry/Biochemistry",
                "Science - Biology",
                "Business/Management",
                "Economics",
                "Law & Criminology",
                "Psychiatry/Psychology",
                "Sociology",
                "Politics",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Persist the full collection every time its size crosses a multiple of this
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u32,

    /// Path of the merged dataset
    #[serde(rename = "merged-path")]
    pub merged_path: String,

    /// Path of the cleaned dataset
    #[serde(rename = "cleaned-path")]
    pub cleaned_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            merged_path: "data/merged_books.csv".to_string(),
            cleaned_path: "data/cleaned_books.csv".to_string(),
        }
    }
}

impl ApiConfig {
    /// The API key to send, if any
    ///
    /// Falls back to the `GOOGLE_BOOKS_API_KEY` environment variable when the
    /// config leaves it unset. Blank keys count as no key.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GOOGLE_BOOKS_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}
