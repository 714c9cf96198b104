use anyhow::Context;
use clap::Parser;
use inspection_report::cli::{Cli, Commands, DefectInput};
use inspection_report::config::Config;
use inspection_report::photo::{IncomingImage, UploadField};
use inspection_report::service::{ForkRequest, ReportService};
use inspection_report::store::JsonFileStore;
use inspection_report::{scanner, telemetry};
use inspection_report_common::{AfterReportState, DraftDefect, NewReport, Report, ReportKind};
use std::path::Path;
use std::sync::Arc;

fn read_drafts(path: Option<&Path>) -> anyhow::Result<Vec<DraftDefect>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("下書きJSONを読めません: {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn collect_photos(input: &DefectInput) -> anyhow::Result<Vec<IncomingImage>> {
    let mut photos: Vec<IncomingImage> = input.photos.iter().map(|p| IncomingImage::from_path(p)).collect();
    if let Some(folder) = &input.folder {
        photos.extend(scanner::scan_folder(folder)?);
    }
    Ok(photos)
}

fn print_report(report: &Report) {
    println!("{} ({})", report.kind().title(), report.id);
    println!("  顧客: {} / {}", report.customer_name, report.phone);
    println!(
        "  物件: {} {}棟 {}号 / 点検日 {}",
        report.apartment_name, report.dong, report.home, report.date
    );
    println!(
        "  目視点検: {}件 (写真{}枚) / 設備点検: {}",
        report.visual_inspection.len(),
        report.image_count(),
        if report.is_equipment_inspected() { "済" } else { "未" }
    );
    for (i, entry) in report.visual_inspection.iter().enumerate() {
        println!(
            "  {:>3}. [{}] {} / {} / {} - {} ({}枚)",
            i + 1,
            entry.id,
            entry.location,
            entry.sector,
            entry.specific,
            entry.content,
            entry.images.len()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let config = match &cli.root {
        Some(root) => Config::rooted_at(root),
        None => Config::load()?,
    };

    if let Commands::Config { show, save } = &cli.command {
        if *save {
            config.save()?;
            println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
        }
        if *show || !*save {
            println!("設定:");
            println!("  データ: {}", config.data_dir.display());
            println!("  アップロード: {}", config.upload_dir.display());
            println!("  出力作業: {}", config.export_dir.display());
            println!("  最大幅: {}px / JPEG品質: {}", config.max_image_width, config.jpeg_quality);
            println!(
                "  アップロード上限: 一括{}枚 / 追加{}枚",
                config.bulk_upload_cap, config.adhoc_upload_cap
            );
            println!(
                "  出力上限: {}枚 / {}秒",
                config.max_export_images, config.export_timeout_seconds
            );
            println!(
                "  フォント: {}",
                config
                    .font_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "Helvetica (組み込み)".to_string())
            );
        }
        return Ok(());
    }

    let store = JsonFileStore::open(&config.data_dir).context("ストアを開けません")?;
    let service = ReportService::new(&config, Arc::new(store));

    match cli.command {
        Commands::Create { date, apartment, dong, home, customer, phone } => {
            let id = service
                .create_report(NewReport {
                    date,
                    apartment_name: apartment,
                    dong,
                    home,
                    customer_name: customer,
                    phone,
                })
                .await?;
            println!("✔ 報告書を作成: {}", id);
        }

        Commands::Show { id, kind, json } => {
            let report = service.get_report(id, kind).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::List { search } => {
            let reports = service.list_reports(search.as_deref()).await?;
            println!("{}件", reports.len());
            for report in &reports {
                let after = service.get_report(report.id, ReportKind::After).await.ok();
                let state = match AfterReportState::of(after.as_ref()) {
                    AfterReportState::NotStarted => "-",
                    AfterReportState::Drafted => "事後点検作成済",
                    AfterReportState::Updated => "事後点検更新済",
                };
                println!(
                    "  {}  {}  {} {}-{}  欠陥{}件  {}",
                    report.id,
                    report.customer_name,
                    report.apartment_name,
                    report.dong,
                    report.home,
                    report.visual_inspection.len(),
                    state
                );
            }
        }

        Commands::EditCustomer { id, kind, customer } => {
            service.update_customer(id, kind, &customer.into()).await?;
            println!("✔ 顧客情報を更新しました");
        }

        Commands::AddDefects { id, kind, input, bulk } => {
            let drafts = read_drafts(input.drafts.as_deref())?;
            let photos = collect_photos(&input)?;
            let field = if bulk { UploadField::Bulk } else { UploadField::AdHoc };

            println!("- {}行・写真{}枚を登録中...", drafts.len(), photos.len());
            let entries = service.append_defects(id, kind, &drafts, photos, field).await?;
            println!("✔ {}件の欠陥記録を追加", entries.len());
            for entry in &entries {
                println!("  [{}] {} / {} ({}枚)", entry.id, entry.location, entry.content, entry.images.len());
            }
        }

        Commands::RemoveDefects { id, entries, kind } => {
            let ids = entries.into_iter().collect();
            let removed = service.remove_defects(id, kind, &ids).await?;
            println!("✔ {}件を削除", removed);
        }

        Commands::EditDefect { entry, kind, fields } => {
            let report_id = service.edit_defect(kind, entry, &fields.into()).await?;
            println!("✔ 欠陥記録を更新しました (報告書 {})", report_id);
        }

        Commands::SetEquipment { id, input, kind } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("入力JSONを読めません: {}", input.display()))?;
            let raw = inspection_report::equipment::RawPanels::from_json(&content)?;
            service.set_equipment_panel(id, kind, &raw).await?;
            println!("✔ 設備点検を保存しました");
        }

        Commands::Fork { id, customer, input, remove } => {
            let request = ForkRequest {
                customer: customer.into(),
                remove: remove.into_iter().collect(),
                drafts: read_drafts(input.drafts.as_deref())?,
                uploads: collect_photos(&input)?,
            };
            let after = service.fork_after_report(id, request).await?;
            println!("✔ 事後点検を保存: 欠陥{}件", after.visual_inspection.len());
        }

        Commands::AfterExists { id } => {
            let exists = service.after_report_exists(id).await?;
            println!("{}", exists);
        }

        Commands::Pdf { id, kind, output } => {
            println!("- PDFを生成中...");
            let artifact = service.render_document(id, kind).await?;
            let path = artifact.write_to(&output)?;
            println!("✔ PDF出力: {}", path.display());
        }

        Commands::Images { id, kind, output } => {
            println!("- 画像ZIPを生成中...");
            let artifact = service.render_image_bundle(id, kind).await?;
            let path = artifact.write_to(&output)?;
            println!("✔ ZIP出力: {}", path.display());
        }

        // ストアを開く前に処理済み
        Commands::Config { .. } => {}
    }

    Ok(())
}
