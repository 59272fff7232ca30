use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Size category of an artifact, resolved once from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Code,
    Document,
    Data,
    Image,
    /// Anything without a recognized extension.
    Other,
}

impl ContentCategory {
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let ext = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return ContentCategory::Other,
        };
        match ext.as_str() {
            "js" | "mjs" | "cjs" | "ts" | "tsx" | "jsx" | "rs" | "py" | "go" | "java" | "c"
            | "h" | "cc" | "cpp" | "hpp" | "cs" | "rb" | "php" | "sh" | "css" | "scss"
            | "wat" => ContentCategory::Code,
            "md" | "markdown" | "txt" | "html" | "htm" | "rst" | "adoc" | "pdf" => {
                ContentCategory::Document
            }
            "json" | "jsonl" | "yaml" | "yml" | "toml" | "csv" | "tsv" | "xml" | "sql" => {
                ContentCategory::Data
            }
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "bmp" | "ico" => {
                ContentCategory::Image
            }
            _ => ContentCategory::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentCategory::Code => "code",
            ContentCategory::Document => "document",
            ContentCategory::Data => "data",
            ContentCategory::Image => "image",
            ContentCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(ContentCategory::Code),
            "document" => Ok(ContentCategory::Document),
            "data" => Ok(ContentCategory::Data),
            "image" => Ok(ContentCategory::Image),
            "other" => Ok(ContentCategory::Other),
            _ => Err(format!(
                "invalid content category: {s}. Expected: code, document, data, image, other"
            )),
        }
    }
}

/// Per-category byte limits applied before every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    pub code: u64,
    pub document: u64,
    pub data: u64,
    pub image: u64,
    pub other: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            code: MIB,
            document: 5 * MIB,
            data: 10 * MIB,
            image: 5 * MIB,
            other: 2 * MIB,
        }
    }
}

impl SizeLimits {
    pub fn limit_for(&self, category: ContentCategory) -> u64 {
        match category {
            ContentCategory::Code => self.code,
            ContentCategory::Document => self.document,
            ContentCategory::Data => self.data,
            ContentCategory::Image => self.image,
            ContentCategory::Other => self.other,
        }
    }
}
