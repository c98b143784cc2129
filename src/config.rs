use crate::ai_provider::AiProvider;
use crate::error::{RouteAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub provider: AiProvider,
    pub anthropic_model: String,
    pub openai_model: String,
    /// アップロード前に縮小する最大辺（px）
    pub max_image_size: u32,
    pub timeout_seconds: u64,
    pub nominatim_url: String,
    /// Nominatim利用規約で必須
    pub user_agent: String,
    /// Nominatimへのリクエスト間隔（ミリ秒）
    pub request_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: AiProvider::Anthropic,
            anthropic_model: AiProvider::Anthropic.default_model().into(),
            openai_model: AiProvider::OpenAi.default_model().into(),
            max_image_size: 1568, // Claude Vision推奨サイズ
            timeout_seconds: 120,
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            user_agent: "RouteGeneratorApp/1.0".into(),
            request_delay_ms: 1100, // 1秒に1回の制限に少し余裕を持たせる
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 読み込みに失敗したら警告して既定値を使う（設定の修復用）
    pub fn load_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                tracing::warn!("設定を読み込めません、既定値を使います: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_or_default_from(config_path: &Path) -> Self {
        Self::load_from(config_path).unwrap_or_else(|e| {
            tracing::warn!(path = %config_path.display(), "設定を読み込めません、既定値を使います: {}", e);
            Self::default()
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RouteAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("route-ai").join("config.json"))
    }

    /// 指定プロバイダのAPIキーを取得（環境変数を優先）
    pub fn get_api_key(&self, provider: AiProvider) -> Result<String> {
        if let Ok(key) = std::env::var(provider.api_key_env_var()) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        // 保存済みキーは保存時のプロバイダでのみ有効
        match &self.api_key {
            Some(key) if provider == self.provider && !key.trim().is_empty() => Ok(key.clone()),
            _ => Err(RouteAiError::MissingApiKey(provider.api_key_env_var())),
        }
    }

    pub fn model_for(&self, provider: AiProvider) -> &str {
        match provider {
            AiProvider::Anthropic => &self.anthropic_model,
            AiProvider::OpenAi => &self.openai_model,
        }
    }

    /// APIキーとプロバイダを保存（空白のみのキーは無視）
    pub fn set_api_key(&mut self, key: String, provider: AiProvider) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        self.api_key = Some(key.trim().to_string());
        self.provider = provider;
        true
    }

    /// APIキーを削除し、プロバイダを既定に戻す
    pub fn clear_api_key(&mut self) {
        self.api_key = None;
        self.provider = AiProvider::default();
    }
}
