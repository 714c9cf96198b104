use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// チェックボックスとして扱う設備点検フィールド名（既定値）
pub const DEFAULT_CHECKBOX_FIELDS: &[&str] =
    &["checked", "normal", "abnormal", "pass", "fail", "detected"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 報告書ドキュメントの保存先
    pub data_dir: PathBuf,
    /// アップロード画像（圧縮済み）の保存先
    pub upload_dir: PathBuf,
    /// エクスポート時の一時ファイル置き場
    pub export_dir: PathBuf,
    /// 圧縮時の最大幅(px)
    pub max_image_width: u32,
    /// JPEG品質 (0-100)
    pub jpeg_quality: u8,
    /// 一括登録時のアップロード上限
    pub bulk_upload_cap: usize,
    /// 欠陥追加時のアップロード上限
    pub adhoc_upload_cap: usize,
    /// 1報告書あたりのエクスポート画像上限
    pub max_export_images: usize,
    pub export_timeout_seconds: u64,
    /// PDFに埋め込むTTF（ハングル等の非ラテン文字用）
    pub font_path: Option<PathBuf>,
    /// 真偽値に変換するフィールド名
    pub checkbox_fields: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default_config()
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReportError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("inspection-report").join("config.json"))
    }

    /// 指定ディレクトリ配下に data/upload/exports を置く設定
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            upload_dir: root.join("upload"),
            export_dir: root.join("exports"),
            ..Self::default_config()
        }
    }

    fn default_config() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("upload"),
            export_dir: PathBuf::from("exports"),
            max_image_width: 1024,
            jpeg_quality: 50,
            bulk_upload_cap: 300,
            adhoc_upload_cap: 2,
            max_export_images: 600,
            export_timeout_seconds: 300,
            font_path: None,
            checkbox_fields: DEFAULT_CHECKBOX_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 環境変数を優先
    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("INSPECTION_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("INSPECTION_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("INSPECTION_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("INSPECTION_FONT_PATH") {
            if !path.trim().is_empty() {
                self.font_path = Some(PathBuf::from(path));
            }
        }
    }
}
