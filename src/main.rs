use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use route_ai_common::address_list::{edit_address, move_address, remove_address, set_use_geocode};
use route_ai_common::{build_route_chunks, visible_chunks, Address, RouteOptions};
use route_ai_rust::{ai_provider, cli, config, error, extractor, geocode, report, review, scanner, store};
use ai_provider::AiProvider;
use cli::{Cli, Commands, Location};
use config::Config;
use error::{RouteAiError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

/// ログ初期化（RUST_LOG があればそちらを優先）
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // 壊れた設定ファイルでも config コマンドで修復できるようにする
    let mut config = match cli.command {
        Commands::Config { .. } => Config::load_or_default(),
        _ => Config::load()?,
    };
    let provider = cli.provider.unwrap_or(config.provider);

    match cli.command {
        Commands::Extract { inputs, output, use_cache, cache_dir, recursive } => {
            println!("📸 route-ai - 住所抽出\n");

            let cache_dir = use_cache.then(|| cache_dir.unwrap_or_else(|| PathBuf::from(".")));
            let addresses = extract_step(&config, provider, &inputs, recursive, cache_dir.as_deref(), "[1/2]").await?;

            println!("[2/2] 結果を保存中...");
            let output = output.unwrap_or_else(|| PathBuf::from(store::DEFAULT_ADDRESSES_FILE));
            store::save_addresses(&output, &addresses)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 抽出完了 ({}件)", addresses.len());
        }

        Commands::Validate { input, output, basic_only } => {
            println!("🔎 route-ai - 住所検証\n");

            let mut addresses = store::load_addresses(&input)?;
            if basic_only {
                println!("[1/2] 形式チェック中...");
                let passed = geocode::validate::apply_basic_validation(&mut addresses);
                println!("✔ 合格 {}件 / 不合格 {}件\n", passed.len(), addresses.len() - passed.len());
            } else {
                validate_step(&config, &mut addresses, "[1/2]").await?;
            }

            println!("[2/2] 結果を保存中...");
            let output = output.unwrap_or(input);
            store::save_addresses(&output, &addresses)?;
            println!("✔ 結果を保存: {}", output.display());
        }

        Commands::Route { input, location, exclude, avoid_highways, json, open } => {
            let addresses = store::load_addresses(&input)?;
            let options = RouteOptions { avoid_highways };
            route_step(&addresses, location, &exclude, &options, json.as_deref(), open)?;
        }

        Commands::Run { inputs, output, validate, location, avoid_highways, open, use_cache, cache_dir, recursive } => {
            println!("🚚 route-ai - 抽出からルート生成まで\n");
            let total = if validate { 4 } else { 3 };

            let cache_dir = use_cache.then(|| cache_dir.unwrap_or_else(|| PathBuf::from(".")));
            let mut addresses = extract_step(
                &config,
                provider,
                &inputs,
                recursive,
                cache_dir.as_deref(),
                &format!("[1/{}]", total),
            )
            .await?;

            if validate {
                validate_step(&config, &mut addresses, &format!("[2/{}]", total)).await?;
            }

            println!("[{}/{}] 結果を保存中...", total - 1, total);
            let output = output.unwrap_or_else(|| PathBuf::from(store::DEFAULT_ADDRESSES_FILE));
            store::save_addresses(&output, &addresses)?;
            println!("✔ 結果を保存: {}\n", output.display());

            println!("[{}/{}] ルート生成中...", total, total);
            let options = RouteOptions { avoid_highways };
            route_step(&addresses, location, &[], &options, None, open)?;

            println!("\n✅ 完了");
        }

        Commands::Review { input, output } => {
            println!("📍 route-ai - 住所レビュー\n");
            review::run_interactive_review(&input, output.as_deref())?;
        }

        Commands::Remove { input, order, output } => {
            update_list(&input, output.as_deref(), |addresses| {
                let removed = remove_address(addresses, order)?;
                println!("✔ 削除しました: {}", removed.text);
                Ok(())
            })?;
        }

        Commands::Edit { input, order, text, output } => {
            if text.trim().is_empty() {
                return Err(RouteAiError::CliExecution("住所が空です".into()));
            }
            update_list(&input, output.as_deref(), |addresses| {
                edit_address(addresses, order, &text)?;
                println!("✔ 変更しました: {}", text.trim());
                Ok(())
            })?;
        }

        Commands::Geocode { input, order, off, output } => {
            update_list(&input, output.as_deref(), |addresses| {
                set_use_geocode(addresses, order, !off)?;
                println!("✔ 座標優先: {}", if off { "OFF" } else { "ON" });
                Ok(())
            })?;
        }

        Commands::Move { input, order, position, output } => {
            if position == 0 {
                return Err(RouteAiError::CliExecution("移動先は1以上で指定してください".into()));
            }
            update_list(&input, output.as_deref(), |addresses| {
                move_address(addresses, order, position - 1)?;
                println!("✔ {}番目へ移動しました", position);
                Ok(())
            })?;
        }

        Commands::Config { set_api_key, clear, show } => {
            let show = show || (set_api_key.is_none() && !clear);

            if clear {
                config.clear_api_key();
                config.save()?;
                println!("✔ APIキーを削除しました");
            }

            if let Some(key) = set_api_key {
                if !config.set_api_key(key, provider) {
                    return Err(RouteAiError::Config("APIキーが空です".into()));
                }
                config.save()?;
                println!("✔ APIキーを設定しました ({})", provider);
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  プロバイダ: {}", config.provider);
                println!("  モデル: {}", config.model_for(config.provider));
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  Nominatim: {}", config.nominatim_url);
                println!("  User-Agent: {}", config.user_agent);
                println!("  リクエスト間隔: {}ms", config.request_delay_ms);
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
                let env_var = config.provider.api_key_env_var();
                if std::env::var(env_var).is_ok() {
                    println!("  環境変数 {}: 設定済み（優先）", env_var);
                }
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = extractor::CacheFile::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = extractor::CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match extractor::CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn progress_bar(len: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(&format!("  {{bar:30.cyan/blue}} {{pos}}/{{len}} {} ({{elapsed}})", unit))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// 画像スキャン → 住所抽出
async fn extract_step(
    config: &Config,
    provider: AiProvider,
    inputs: &[PathBuf],
    recursive: bool,
    cache_dir: Option<&Path>,
    step: &str,
) -> Result<Vec<Address>> {
    println!("{} 画像をスキャン中...", step);
    let images = scanner::scan_inputs(inputs, recursive)?;
    if images.is_empty() {
        return Err(RouteAiError::NoImagesFound(
            inputs.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
        ));
    }
    println!("✔ {}枚の画像を検出", images.len());

    println!(
        "{} 住所を抽出中 ({}){}",
        step,
        provider,
        if cache_dir.is_some() { " (キャッシュ有効)" } else { "" }
    );
    let client = extractor::build_extractor(config, provider)?;
    let mut cache = cache_dir.map(extractor::CacheFile::load);

    let total = images.len() as u64;
    let pb = progress_bar(total, "枚");
    let result = extractor::extract_addresses_from_images(
        client.as_ref(),
        &images,
        config.max_image_size,
        cache.as_mut(),
        |fraction| pb.set_position((fraction * total as f64).round() as u64),
    )
    .await;
    pb.finish_and_clear();
    let addresses = result?;

    if let (Some(cache), Some(dir)) = (&cache, cache_dir) {
        if let Err(e) = cache.save(dir) {
            tracing::warn!("キャッシュ保存失敗: {}", e);
        }
    }

    println!("✔ {}件の住所を抽出\n", addresses.len());
    Ok(addresses)
}

/// 形式チェック → ジオコーディング検証
async fn validate_step(config: &Config, addresses: &mut [Address], step: &str) -> Result<()> {
    let interval = Duration::from_millis(config.request_delay_ms);
    println!(
        "{} 住所を検証中... ({}件、{:.1}秒間隔)",
        step,
        addresses.len(),
        interval.as_secs_f64()
    );

    let client = geocode::NominatimClient::new(
        config.nominatim_url.as_str(),
        &config.user_agent,
        config.timeout_seconds,
    )?;
    let validator = geocode::RateLimitedValidator::new(client, interval);

    let pb = progress_bar(addresses.len() as u64, "件");
    let summary = geocode::validate_addresses(addresses, &validator, |_| pb.inc(1)).await;
    pb.finish_and_clear();

    println!(
        "✔ 検証完了: 有効 {}件 / 形式エラー {}件 / 確認不可 {}件\n",
        summary.valid, summary.invalid, summary.error
    );
    for address in addresses.iter().filter(|a| !route_ai_common::is_address_valid(a)) {
        println!("  ⚠ {}", review::describe_address(address));
    }
    Ok(())
}

/// ルート区間を生成して表示・保存・オープン
fn route_step(
    addresses: &[Address],
    location: Option<Location>,
    exclude: &[usize],
    options: &RouteOptions,
    json: Option<&Path>,
    open: bool,
) -> Result<()> {
    let chunks = build_route_chunks(
        addresses,
        location.map(|l| l.latitude),
        location.map(|l| l.longitude),
        options,
    );
    let excluded: HashSet<usize> = exclude.iter().copied().collect();
    let visible = visible_chunks(&chunks, &excluded);

    if visible.is_empty() {
        println!("ルートに使える住所がありません");
        return Ok(());
    }

    println!("🗺  {}件の住所 → {}区間", addresses.len(), visible.len());
    report::print_route_chunks(&visible);

    if let Some(path) = json {
        report::write_routes_json(path, &visible)?;
        println!("\n✔ ルートを保存: {}", path.display());
    }

    if open {
        report::open_routes(&visible);
    }
    Ok(())
}

/// 住所JSONを読み込み、編集して保存
fn update_list(
    input: &Path,
    output: Option<&Path>,
    edit: impl FnOnce(&mut Vec<Address>) -> Result<()>,
) -> Result<()> {
    let mut addresses = store::load_addresses(input)?;
    edit(&mut addresses)?;
    let output = output.unwrap_or(input);
    store::save_addresses(output, &addresses)?;
    Ok(())
}
