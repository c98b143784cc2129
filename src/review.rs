//! 対話式の住所レビュー
//!
//! 抽出した住所を1件ずつ表示し、編集・削除・座標優先の切替・並べ替えを行う。
//! 変更は並び順キーで住所リストに反映し、終了時に保存する。

use crate::error::{RouteAiError, Result};
use crate::store::{load_addresses, save_addresses};
use dialoguer::Input;
use route_ai_common::address_list::{edit_address, move_address, remove_address, set_use_geocode};
use route_ai_common::{Address, ValidationStatus};
use std::path::Path;

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// 次の住所へ
    Next,
    /// 住所文字列を編集
    Edit,
    /// この住所を削除
    Delete,
    /// ルートURLで座標を使うかを切り替え
    ToggleGeocode,
    /// 指定位置（1始まり）へ移動
    MoveTo(usize),
    /// 保存して終了
    Quit,
}

/// 入力文字列をアクションに変換（解釈できなければ None）
pub fn parse_review_action(input: &str) -> Option<ReviewAction> {
    let trimmed = input.trim();
    match trimmed {
        "" | "n" => return Some(ReviewAction::Next),
        "e" => return Some(ReviewAction::Edit),
        "d" => return Some(ReviewAction::Delete),
        "g" => return Some(ReviewAction::ToggleGeocode),
        "q" | "Q" => return Some(ReviewAction::Quit),
        _ => {}
    }

    let rest = trimmed.strip_prefix('m')?.trim();
    match rest.parse::<usize>() {
        Ok(position) if position >= 1 => Some(ReviewAction::MoveTo(position)),
        _ => None,
    }
}

/// 1行表示（状態・座標・座標優先フラグ付き）
pub fn describe_address(address: &Address) -> String {
    let mut line = format!("{} [{}]", address.text, address.status());

    if let Some((lat, lng)) = address.coordinates() {
        line.push_str(&format!(" ({:.5}, {:.5})", lat, lng));
    }
    if address.use_geocode {
        line.push_str(" 座標優先");
    }
    if let Some(validation) = &address.validation {
        if matches!(validation.status, ValidationStatus::Invalid | ValidationStatus::Error)
            && !validation.errors.is_empty()
        {
            line.push_str(&format!(" - {}", validation.errors.join(", ")));
        }
    }
    line
}

/// アクションの結果
#[derive(Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// 続行
    Continue,
    /// 住所が削除された
    Removed,
    /// 終了
    Stop,
}

/// 編集以外のアクションを住所リストへ適用
pub fn apply_action(addresses: &mut Vec<Address>, order: u32, action: &ReviewAction) -> Result<ActionOutcome> {
    match action {
        ReviewAction::Next | ReviewAction::Edit => Ok(ActionOutcome::Continue),
        ReviewAction::Delete => {
            remove_address(addresses, order)?;
            Ok(ActionOutcome::Removed)
        }
        ReviewAction::ToggleGeocode => {
            let current = addresses
                .iter()
                .find(|a| a.order == order)
                .map(|a| a.use_geocode)
                .unwrap_or(false);
            set_use_geocode(addresses, order, !current)?;
            Ok(ActionOutcome::Continue)
        }
        ReviewAction::MoveTo(position) => {
            move_address(addresses, order, position.saturating_sub(1))?;
            Ok(ActionOutcome::Continue)
        }
        ReviewAction::Quit => Ok(ActionOutcome::Stop),
    }
}

/// 対話式レビューを実行
pub fn run_interactive_review(input_path: &Path, output_path: Option<&Path>) -> Result<()> {
    let mut addresses = load_addresses(input_path)?;

    if addresses.is_empty() {
        println!("✓ 住所がありません");
        return Ok(());
    }

    println!("📍 住所: {}件", addresses.len());
    println!("---");
    println!("操作: [Enter]次へ [e]編集 [d]削除 [g]座標優先切替 [m N]N番目へ移動 [q]終了");
    println!("---\n");

    // 並べ替えで位置が変わっても各住所を1回ずつ表示する
    let orders: Vec<u32> = addresses.iter().map(|a| a.order).collect();

    for order in orders {
        let Some(position) = addresses.iter().position(|a| a.order == order) else {
            continue;
        };

        println!(
            "[{}/{}] {}",
            position + 1,
            addresses.len(),
            describe_address(&addresses[position])
        );

        let outcome = loop {
            let action = prompt_review_action()?;

            if action == ReviewAction::Edit {
                let current = addresses[position].text.clone();
                let text = prompt_text(&current)?;
                if text.trim().is_empty() {
                    println!("  → 空の住所は登録できません");
                    continue;
                }
                edit_address(&mut addresses, order, &text)?;
                println!("  → {}\n", text.trim());
                break ActionOutcome::Continue;
            }

            match apply_action(&mut addresses, order, &action) {
                Ok(outcome) => {
                    match &action {
                        ReviewAction::Delete => println!("  → 削除しました\n"),
                        ReviewAction::ToggleGeocode => {
                            let enabled = addresses.iter().any(|a| a.order == order && a.use_geocode);
                            println!("  → 座標優先: {}\n", if enabled { "ON" } else { "OFF" });
                        }
                        ReviewAction::MoveTo(p) => println!("  → {}番目へ移動\n", p),
                        _ => {}
                    }
                    break outcome;
                }
                Err(RouteAiError::Common(e)) => {
                    println!("  → {}", e);
                }
                Err(e) => return Err(e),
            }
        };

        if outcome == ActionOutcome::Stop {
            println!("保存して終了します...");
            break;
        }
    }

    let output = output_path.unwrap_or(input_path);
    save_addresses(output, &addresses)?;
    println!("\n✓ 保存しました: {} ({}件)", output.display(), addresses.len());

    Ok(())
}

fn prompt_review_action() -> Result<ReviewAction> {
    loop {
        let input: String = Input::new()
            .with_prompt("操作 (Enter:次へ e:編集 d:削除 g:座標 m N:移動 q:終了)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| RouteAiError::CliExecution(e.to_string()))?;

        match parse_review_action(&input) {
            Some(action) => return Ok(action),
            None => println!("  → 不明な操作: {}", input.trim()),
        }
    }
}

fn prompt_text(current: &str) -> Result<String> {
    Input::new()
        .with_prompt("住所")
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| RouteAiError::CliExecution(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Address> {
        vec![
            Address::new("1 Main St", 0),
            Address::new("2 Oak St", 1),
            Address::new("3 Pine St", 100),
        ]
    }

    #[test]
    fn test_parse_review_action() {
        assert_eq!(parse_review_action(""), Some(ReviewAction::Next));
        assert_eq!(parse_review_action("  n "), Some(ReviewAction::Next));
        assert_eq!(parse_review_action("e"), Some(ReviewAction::Edit));
        assert_eq!(parse_review_action("d"), Some(ReviewAction::Delete));
        assert_eq!(parse_review_action("g"), Some(ReviewAction::ToggleGeocode));
        assert_eq!(parse_review_action("m 3"), Some(ReviewAction::MoveTo(3)));
        assert_eq!(parse_review_action("m2"), Some(ReviewAction::MoveTo(2)));
        assert_eq!(parse_review_action("Q"), Some(ReviewAction::Quit));
        assert_eq!(parse_review_action("m 0"), None);
        assert_eq!(parse_review_action("m"), None);
        assert_eq!(parse_review_action("x"), None);
    }

    #[test]
    fn test_apply_delete() {
        let mut addresses = sample();
        let outcome = apply_action(&mut addresses, 1, &ReviewAction::Delete).unwrap();
        assert_eq!(outcome, ActionOutcome::Removed);
        assert_eq!(addresses.iter().map(|a| a.order).collect::<Vec<_>>(), vec![0, 100]);
    }

    #[test]
    fn test_apply_toggle_geocode() {
        let mut addresses = sample();
        apply_action(&mut addresses, 100, &ReviewAction::ToggleGeocode).unwrap();
        assert!(addresses[2].use_geocode);
        apply_action(&mut addresses, 100, &ReviewAction::ToggleGeocode).unwrap();
        assert!(!addresses[2].use_geocode);
    }

    #[test]
    fn test_apply_move_is_one_based() {
        let mut addresses = sample();
        apply_action(&mut addresses, 100, &ReviewAction::MoveTo(1)).unwrap();
        assert_eq!(addresses.iter().map(|a| a.order).collect::<Vec<_>>(), vec![100, 0, 1]);
    }

    #[test]
    fn test_apply_move_out_of_range() {
        let mut addresses = sample();
        let result = apply_action(&mut addresses, 0, &ReviewAction::MoveTo(9));
        assert!(matches!(result, Err(RouteAiError::Common(_))));
        assert_eq!(addresses.len(), 3);
    }

    #[test]
    fn test_describe_address() {
        let mut address = Address::new("1 Main St", 0);
        assert_eq!(describe_address(&address), "1 Main St [pending]");

        address.latitude = Some(43.615);
        address.longitude = Some(-116.2023);
        address.use_geocode = true;
        assert_eq!(
            describe_address(&address),
            "1 Main St [pending] (43.61500, -116.20230) 座標優先"
        );

        address.validation = Some(route_ai_common::ValidationResult::invalid(vec![
            "Address too short".into(),
        ]));
        assert!(describe_address(&address).ends_with("- Address too short"));
    }
}
