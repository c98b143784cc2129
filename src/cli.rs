use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "route-ai")]
#[command(about = "スクリーンショットから配達先住所を抽出し、Google Mapsルートを生成するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (anthropic/openai、省略時は設定値)
    #[arg(long, global = true)]
    pub provider: Option<AiProvider>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// スクリーンショットから住所を抽出してJSONを出力
    Extract {
        /// 画像ファイルまたはフォルダ（指定順に処理）
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 出力JSONファイル（デフォルト: addresses.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// キャッシュを使用（抽出済み画像はAPIを呼ばない）
        #[arg(long)]
        use_cache: bool,

        /// キャッシュの保存先フォルダ（省略時はカレント）
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 住所を形式チェックとジオコーディングで検証
    Validate {
        /// 住所JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力先（省略時は上書き）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 形式チェックのみ（ジオコーディングしない）
        #[arg(long)]
        basic_only: bool,
    },

    /// Google Mapsルートを生成
    Route {
        /// 住所JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 現在地 (LAT,LNG)。省略時は My Location
        #[arg(short, long, allow_hyphen_values = true)]
        location: Option<Location>,

        /// 除外する区間ID（0始まり、複数指定可）
        #[arg(long, num_args = 1..)]
        exclude: Vec<usize>,

        /// 高速道路を避ける
        #[arg(long)]
        avoid_highways: bool,

        /// 区間一覧をJSONで保存
        #[arg(long)]
        json: Option<PathBuf>,

        /// ブラウザで開く
        #[arg(long)]
        open: bool,
    },

    /// 抽出からルート生成まで一括実行
    Run {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 住所JSONの出力先（デフォルト: addresses.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ジオコーディングで検証する
        #[arg(long)]
        validate: bool,

        /// 現在地 (LAT,LNG)
        #[arg(short, long, allow_hyphen_values = true)]
        location: Option<Location>,

        /// 高速道路を避ける
        #[arg(long)]
        avoid_highways: bool,

        /// ブラウザで開く
        #[arg(long)]
        open: bool,

        /// キャッシュを使用
        #[arg(long)]
        use_cache: bool,

        /// キャッシュの保存先フォルダ（省略時はカレント）
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 対話的に住所を確認・編集
    Review {
        /// 住所JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力先（省略時は上書き）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 住所を削除
    Remove {
        #[arg(required = true)]
        input: PathBuf,

        /// 並び順キー
        order: u32,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 住所の文字列を変更（検証状態はリセット）
    Edit {
        #[arg(required = true)]
        input: PathBuf,

        /// 並び順キー
        order: u32,

        /// 新しい住所
        text: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// ルートURLで座標を使うよう設定
    Geocode {
        #[arg(required = true)]
        input: PathBuf,

        /// 並び順キー
        order: u32,

        /// 座標を使わない（住所文字列に戻す）
        #[arg(long)]
        off: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 住所を指定位置へ移動
    Move {
        #[arg(required = true)]
        input: PathBuf,

        /// 並び順キー
        order: u32,

        /// 移動先（1始まり）
        position: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定（--provider で対象を指定）
        #[arg(long)]
        set_api_key: Option<String>,

        /// APIキーを削除
        #[arg(long)]
        clear: bool,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

/// 現在地
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid location: {}. Use LAT,LNG", s))?;

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("Invalid latitude: {}", lat.trim()))?;
        let longitude: f64 = lng
            .trim()
            .parse()
            .map_err(|_| format!("Invalid longitude: {}", lng.trim()))?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("Location out of range: {}", s));
        }

        Ok(Location { latitude, longitude })
    }
}
