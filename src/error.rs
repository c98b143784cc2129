use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("Missing API key. Please provide an API key with `route-ai config --set-api-key YOUR_KEY` or set {0} environment variable.")]
    MissingApiKey(&'static str),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("Missing image: {0}")]
    NoImagesFound(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Failed to process image: {0}")]
    ProcessingFailed(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("ジオコーディングエラー: {0}")]
    Geocode(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] route_ai_common::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

impl RouteAiError {
    /// 抽出APIのHTTPステータスをエラー種別に変換
    ///
    /// 401 → APIキー不正、429 → レート制限、それ以外 → 処理失敗
    pub fn from_api_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            401 => RouteAiError::InvalidApiKey,
            429 => RouteAiError::RateLimited,
            _ => RouteAiError::ProcessingFailed(detail.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouteAiError>;
