//! Known record fields
//!
//! These are the column names the merge and clean stages expect. Catalog
//! detail pages may add further free-form columns that have no variant here.

use std::fmt;

/// A semantic field of a bibliographic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    Author,
    Publisher,
    PublishedDate,
    Description,
    Categories,
    Language,
    PageCount,
    AverageRating,
    RatingsCount,
    Thumbnail,
    DetailLink,
    Subjects,
    Year,
    Price,
    Source,
}

/// How a field's values are typed when read back from a CSV cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
}

impl Field {
    /// Every known field, in canonical column order
    pub const ALL: [Field; 17] = [
        Field::Id,
        Field::Title,
        Field::Author,
        Field::Publisher,
        Field::PublishedDate,
        Field::Description,
        Field::Categories,
        Field::Language,
        Field::PageCount,
        Field::AverageRating,
        Field::RatingsCount,
        Field::Thumbnail,
        Field::DetailLink,
        Field::Subjects,
        Field::Year,
        Field::Price,
        Field::Source,
    ];

    /// Column name used in tabular files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Publisher => "publisher",
            Self::PublishedDate => "published_date",
            Self::Description => "description",
            Self::Categories => "categories",
            Self::Language => "language",
            Self::PageCount => "page_count",
            Self::AverageRating => "average_rating",
            Self::RatingsCount => "ratings_count",
            Self::Thumbnail => "thumbnail",
            Self::DetailLink => "detail_link",
            Self::Subjects => "subjects",
            Self::Year => "year",
            Self::Price => "price",
            Self::Source => "source",
        }
    }

    /// Looks up a known field by its column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::PageCount | Self::RatingsCount | Self::Year => FieldKind::Integer,
            Self::AverageRating | Self::Price => FieldKind::Float,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
