//! 受付から出力までの統合テスト
//!
//! MemoryStore + 一時ディレクトリで ReportService を通しで動かす。

use chrono::NaiveDate;
use image::{ImageBuffer, Rgb};
use inspection_report::config::Config;
use inspection_report::equipment::RawPanels;
use inspection_report::error::ReportError;
use inspection_report::photo::{IncomingImage, UploadField};
use inspection_report::service::{ForkRequest, ReportService};
use inspection_report::store::{JsonFileStore, MemoryStore};
use inspection_report_common::{
    AfterReportState, CustomerPatch, DefectEdit, DraftDefect, FieldValue, NewReport, PanelKind,
    ReportKind,
};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Fixture {
    dir: TempDir,
    config: Config,
    service: ReportService,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = Config::rooted_at(dir.path());
    let service = ReportService::new(&config, Arc::new(MemoryStore::new()));
    Fixture { dir, config, service }
}

fn intake(name: &str) -> NewReport {
    NewReport {
        date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        apartment_name: "Hillstate".to_string(),
        dong: "101".to_string(),
        home: "1203".to_string(),
        customer_name: name.to_string(),
        phone: "010-1234-5678".to_string(),
    }
}

fn draft(location: &str, content: &str) -> DraftDefect {
    DraftDefect {
        location: Some(location.to_string()),
        sector: Some("Wall".to_string()),
        specific: Some("Tile".to_string()),
        content: Some(content.to_string()),
        extra: None,
    }
}

/// テスト用の写真（PNG）を作成
fn photo(dir: &Path, name: &str, width: u32) -> IncomingImage {
    let img = ImageBuffer::from_fn(width, width / 2, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    IncomingImage::from_path(&path)
}

fn photos(dir: &Path, count: usize) -> Vec<IncomingImage> {
    let source = dir.join("source");
    std::fs::create_dir_all(&source).unwrap();
    (1..=count).map(|i| photo(&source, &format!("photo{}.png", i), 64)).collect()
}

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
    names.sort();
    names
}

fn upload_files(config: &Config) -> Vec<String> {
    match std::fs::read_dir(&config.upload_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_bulk_defects_pair_images_in_order() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();

    let drafts = vec![draft("Bathroom", "Crack"), draft("Kitchen", "Leak")];
    let entries = fx
        .service
        .append_defects(id, ReportKind::Pre, &drafts, photos(fx.dir.path(), 4), UploadField::Bulk)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.images.len() == 2));
    assert!(entries
        .iter()
        .flat_map(|e| e.images.iter())
        .all(|name| name.starts_with("compressed-") && name.ends_with(".jpg")));

    // 保存されるのは圧縮済みファイルのみ
    let mut stored: Vec<String> = entries.iter().flat_map(|e| e.images.clone()).collect();
    let mut on_disk = upload_files(&fx.config);
    stored.sort();
    on_disk.sort();
    assert_eq!(stored, on_disk);

    let report = fx.service.get_report(id, ReportKind::Pre).await.unwrap();
    assert_eq!(report.visual_inspection[0].location, "Bathroom");
    assert_eq!(report.visual_inspection[1].location, "Kitchen");
    assert!(report.updated_at.is_some());

    let bundle = fx.service.render_image_bundle(id, ReportKind::Pre).await.unwrap();
    assert_eq!(bundle.file_name, "Kim_pre-inspection-images.zip");
    assert_eq!(bundle.content_type, "application/zip");
    assert_eq!(
        zip_names(&bundle.bytes),
        vec!["image-1.jpg", "image-2.jpg", "image-3.jpg", "image-4.jpg"]
    );
}

#[tokio::test]
async fn test_incomplete_draft_does_not_consume_images() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Lee")).await.unwrap();

    let mut incomplete = draft("Balcony", "Stain");
    incomplete.sector = Some("  ".to_string());
    let drafts = vec![incomplete, draft("Bedroom", "Gap")];

    let entries = fx
        .service
        .append_defects(id, ReportKind::Pre, &drafts, photos(fx.dir.path(), 4), UploadField::Bulk)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].location, "Bedroom");
    assert_eq!(entries[0].images.len(), 2);

    // 余った画像は削除される
    assert_eq!(upload_files(&fx.config).len(), 2);
}

#[tokio::test]
async fn test_upload_cap_rejects_before_writing() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Park")).await.unwrap();

    let err = fx
        .service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack")],
            photos(fx.dir.path(), 3),
            UploadField::AdHoc,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Validation(_)));
    assert!(upload_files(&fx.config).is_empty());
    let report = fx.service.get_report(id, ReportKind::Pre).await.unwrap();
    assert!(report.visual_inspection.is_empty());
}

#[tokio::test]
async fn test_disallowed_file_type() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Park")).await.unwrap();

    let path = fx.dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();
    let err = fx
        .service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack")],
            vec![IncomingImage::from_path(&path)],
            UploadField::AdHoc,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Validation(_)));
}

#[tokio::test]
async fn test_corrupt_image_aborts_batch() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Choi")).await.unwrap();

    let mut uploads = photos(fx.dir.path(), 1);
    let broken = fx.dir.path().join("broken.jpg");
    std::fs::write(&broken, b"not a jpeg").unwrap();
    uploads.push(IncomingImage::from_path(&broken));

    let err = fx
        .service
        .append_defects(id, ReportKind::Pre, &[draft("Bathroom", "Crack")], uploads, UploadField::Bulk)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Processing(_)));
    assert!(upload_files(&fx.config).is_empty());
}

#[tokio::test]
async fn test_unknown_report_is_not_found() {
    let fx = fixture();
    let missing = inspection_report_common::ReportId::new();

    let err = fx.service.get_report(missing, ReportKind::Pre).await.unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)));

    let err = fx
        .service
        .append_defects(missing, ReportKind::Pre, &[draft("A", "B")], Vec::new(), UploadField::AdHoc)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)));

    let err = fx
        .service
        .fork_after_report(missing, ForkRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)));

    let err = fx.service.render_document(missing, ReportKind::After).await.unwrap_err();
    assert!(matches!(err, ReportError::NotFound(_)));
}

#[tokio::test]
async fn test_edit_and_remove_defects() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    let entries = fx
        .service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack"), draft("Kitchen", "Leak")],
            Vec::new(),
            UploadField::AdHoc,
        )
        .await
        .unwrap();

    let edit = DefectEdit {
        content: Some("  Wide crack ".to_string()),
        ..Default::default()
    };
    let owner = fx.service.edit_defect(ReportKind::Pre, entries[0].id, &edit).await.unwrap();
    assert_eq!(owner, id);

    let blank = DefectEdit {
        location: Some(" ".to_string()),
        ..Default::default()
    };
    let err = fx.service.edit_defect(ReportKind::Pre, entries[0].id, &blank).await.unwrap_err();
    assert!(matches!(err, ReportError::Validation(_)));

    let ids: HashSet<_> = [entries[1].id, inspection_report_common::DefectId::new()].into_iter().collect();
    let removed = fx.service.remove_defects(id, ReportKind::Pre, &ids).await.unwrap();
    assert_eq!(removed, 1);

    let report = fx.service.get_report(id, ReportKind::Pre).await.unwrap();
    assert_eq!(report.visual_inspection.len(), 1);
    assert_eq!(report.visual_inspection[0].content, "Wide crack");
}

#[tokio::test]
async fn test_equipment_panel_through_service() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();

    let raw = RawPanels::from_json(
        r#"{
            "radon": [
                {"value": "1.2", "checked": "on"},
                {"value": "0.8"},
                {"value": "0.9", "checked": false},
                {"value": "9.9"}
            ],
            "drain_check": [{"normal": true}]
        }"#,
    )
    .unwrap();
    fx.service.set_equipment_panel(id, ReportKind::Pre, &raw).await.unwrap();

    let report = fx.service.get_report(id, ReportKind::Pre).await.unwrap();
    assert!(report.is_equipment_inspected());
    let record = report.equipment_inspection.unwrap();

    let radon = record.panel(PanelKind::Radon);
    assert_eq!(radon.len(), 3);
    assert_eq!(radon[0].location, "Kitchen/Living");
    assert_eq!(radon[0].fields["checked"], FieldValue::Flag(true));
    assert!(!radon[1].fields.contains_key("checked"));
    assert_eq!(radon[2].fields["value"], FieldValue::Text("0.9".to_string()));
    assert_eq!(record.panel(PanelKind::DrainInspection)[0].fields["normal"], FieldValue::Flag(true));
    assert!(record.panel(PanelKind::FloorLevel).is_empty());

    let mut unknown = RawPanels::default();
    unknown.insert("ozone", Vec::new());
    let err = fx.service.set_equipment_panel(id, ReportKind::Pre, &unknown).await.unwrap_err();
    assert!(matches!(err, ReportError::Validation(_)));
}

#[tokio::test]
async fn test_fork_snapshot_and_idempotent_refork() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    fx.service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack")],
            photos(fx.dir.path(), 2),
            UploadField::AdHoc,
        )
        .await
        .unwrap();

    assert!(!fx.service.after_report_exists(id).await.unwrap());

    let request = ForkRequest {
        customer: CustomerPatch {
            phone: Some("010-0000-0000".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let after = fx.service.fork_after_report(id, request.clone()).await.unwrap();
    assert_eq!(after.id, id);
    assert_eq!(after.kind(), ReportKind::After);
    assert_eq!(after.original_report_id, Some(id));
    assert_eq!(after.phone, "010-0000-0000");
    assert_eq!(after.visual_inspection.len(), 1);
    assert_eq!(AfterReportState::of(Some(&after)), AfterReportState::Drafted);
    assert!(fx.service.after_report_exists(id).await.unwrap());

    // 同じ内容で再実行しても欠陥は重複しない
    let again = fx.service.fork_after_report(id, request).await.unwrap();
    assert_eq!(again.visual_inspection.len(), 1);
    assert_eq!(AfterReportState::of(Some(&again)), AfterReportState::Updated);

    // 事後点検への変更は事前点検に影響しない
    fx.service
        .append_defects(id, ReportKind::After, &[draft("Kitchen", "Leak")], Vec::new(), UploadField::AdHoc)
        .await
        .unwrap();
    let pre = fx.service.get_report(id, ReportKind::Pre).await.unwrap();
    let after = fx.service.get_report(id, ReportKind::After).await.unwrap();
    assert_eq!(pre.visual_inspection.len(), 1);
    assert_eq!(pre.phone, "010-1234-5678");
    assert_eq!(after.visual_inspection.len(), 2);
}

#[tokio::test]
async fn test_fork_with_removal_and_new_defects() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    let entries = fx
        .service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack"), draft("Kitchen", "Leak")],
            Vec::new(),
            UploadField::Bulk,
        )
        .await
        .unwrap();

    let request = ForkRequest {
        remove: [entries[0].id].into_iter().collect(),
        drafts: vec![draft("Balcony", "Stain"), draft("kitchen", " LEAK ")],
        uploads: photos(fx.dir.path(), 2),
        ..Default::default()
    };
    let after = fx.service.fork_after_report(id, request).await.unwrap();

    let locations: Vec<&str> = after.visual_inspection.iter().map(|e| e.location.as_str()).collect();
    assert_eq!(locations, vec!["Kitchen", "Balcony"]);
    assert_eq!(after.visual_inspection[1].images.len(), 2);
}

#[tokio::test]
async fn test_after_bundle_uses_after_prefix_and_global_numbering() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    fx.service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack"), draft("Kitchen", "Leak")],
            photos(fx.dir.path(), 3),
            UploadField::Bulk,
        )
        .await
        .unwrap();
    fx.service.fork_after_report(id, ForkRequest::default()).await.unwrap();

    let bundle = fx.service.render_image_bundle(id, ReportKind::After).await.unwrap();
    assert_eq!(bundle.file_name, "Kim_post-inspection-images.zip");
    assert_eq!(
        zip_names(&bundle.bytes),
        vec!["after-image-1.jpg", "after-image-2.jpg", "after-image-3.jpg"]
    );

    // 一時ディレクトリは残らない
    let leftovers = std::fs::read_dir(&fx.config.export_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_document_without_defects() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();

    let artifact = fx.service.render_document(id, ReportKind::Pre).await.unwrap();
    assert_eq!(artifact.file_name, "Kim_pre-inspection-report.pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));

    let path = artifact.write_to(&fx.dir.path().join("out")).unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_document_with_photos_and_equipment() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    fx.service
        .append_defects(
            id,
            ReportKind::Pre,
            &[draft("Bathroom", "Crack"), draft("Kitchen", "Leak")],
            photos(fx.dir.path(), 3),
            UploadField::Bulk,
        )
        .await
        .unwrap();
    let raw = RawPanels::from_json(r#"{"radon": [{"value": "1.0"}]}"#).unwrap();
    fx.service.set_equipment_panel(id, ReportKind::Pre, &raw).await.unwrap();

    let artifact = fx.service.render_document(id, ReportKind::Pre).await.unwrap();
    assert!(artifact.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_list_reports_search() {
    let fx = fixture();
    fx.service.create_report(intake("Kim Minsu")).await.unwrap();
    fx.service.create_report(intake("Lee Jiwoo")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newest = fx.service.create_report(intake("KIM Daeho")).await.unwrap();

    let all = fx.service.list_reports(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, newest);

    let kims = fx.service.list_reports(Some("kim")).await.unwrap();
    assert_eq!(kims.len(), 2);
}

#[tokio::test]
async fn test_blank_customer_name_rejected() {
    let fx = fixture();
    let err = fx.service.create_report(intake("  ")).await.unwrap_err();
    assert!(matches!(err, ReportError::Validation(_)));

    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    let patch = CustomerPatch {
        customer_name: Some(String::new()),
        ..Default::default()
    };
    let err = fx.service.update_customer(id, ReportKind::Pre, &patch).await.unwrap_err();
    assert!(matches!(err, ReportError::Validation(_)));
}

#[tokio::test]
async fn test_json_file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let config = Config::rooted_at(dir.path());

    let id = {
        let store = JsonFileStore::open(&config.data_dir).unwrap();
        let service = ReportService::new(&config, Arc::new(store));
        let id = service.create_report(intake("Kim")).await.unwrap();
        service
            .append_defects(id, ReportKind::Pre, &[draft("Bathroom", "Crack")], Vec::new(), UploadField::AdHoc)
            .await
            .unwrap();
        service.fork_after_report(id, ForkRequest::default()).await.unwrap();
        id
    };

    let store = JsonFileStore::open(&config.data_dir).unwrap();
    let service = ReportService::new(&config, Arc::new(store));
    let pre = service.get_report(id, ReportKind::Pre).await.unwrap();
    assert_eq!(pre.visual_inspection.len(), 1);
    assert!(service.after_report_exists(id).await.unwrap());
}

/// 保存済みの画像と記録が参照する画像が一致すること
fn assert_uploads_match(config: &Config, report: &inspection_report_common::Report) {
    let mut referenced: Vec<String> = report.visual_inspection.iter().flat_map(|e| e.images.clone()).collect();
    let mut on_disk = upload_files(config);
    referenced.sort();
    on_disk.sort();
    assert_eq!(referenced, on_disk);
}

#[tokio::test]
async fn test_refork_with_same_drafts_and_uploads() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    fx.service
        .append_defects(id, ReportKind::Pre, &[draft("Bathroom", "Crack")], Vec::new(), UploadField::AdHoc)
        .await
        .unwrap();

    let request = || ForkRequest {
        drafts: vec![draft("Balcony", "Stain")],
        uploads: photos(fx.dir.path(), 2),
        ..Default::default()
    };
    let first = fx.service.fork_after_report(id, request()).await.unwrap();
    assert_eq!(first.visual_inspection.len(), 2);

    let second = fx.service.fork_after_report(id, request()).await.unwrap();
    assert_eq!(second.visual_inspection.len(), 2);
    assert_eq!(second.visual_inspection[1].images, first.visual_inspection[1].images);

    let ids: HashSet<_> = second.visual_inspection.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), second.visual_inspection.len());

    // 2回目の画像は記録に使われないため削除される
    assert_uploads_match(&fx.config, &second);
}

#[tokio::test]
async fn test_fork_keeps_identical_rows_in_one_submission() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();

    let request = ForkRequest {
        drafts: vec![draft("Balcony", "Stain"), draft("Balcony", "Stain")],
        uploads: photos(fx.dir.path(), 4),
        ..Default::default()
    };
    let after = fx.service.fork_after_report(id, request).await.unwrap();

    assert_eq!(after.visual_inspection.len(), 2);
    assert_ne!(after.visual_inspection[0].id, after.visual_inspection[1].id);
    assert_ne!(after.visual_inspection[0].images, after.visual_inspection[1].images);
    assert!(after.visual_inspection.iter().all(|e| e.images.len() == 2));
    assert_uploads_match(&fx.config, &after);
}

#[tokio::test]
async fn test_fork_does_not_lose_concurrent_append() {
    let fx = fixture();
    let id = fx.service.create_report(intake("Kim")).await.unwrap();
    fx.service.fork_after_report(id, ForkRequest::default()).await.unwrap();

    let request = ForkRequest {
        drafts: vec![draft("Balcony", "Stain")],
        uploads: photos(fx.dir.path(), 2),
        ..Default::default()
    };
    let concurrent = [draft("Kitchen", "Leak")];

    // 画像処理の最中に別の追加が割り込む
    let (forked, appended) = tokio::join!(
        fx.service.fork_after_report(id, request),
        fx.service
            .append_defects(id, ReportKind::After, &concurrent, Vec::new(), UploadField::AdHoc),
    );
    forked.unwrap();
    appended.unwrap();

    let after = fx.service.get_report(id, ReportKind::After).await.unwrap();
    let mut locations: Vec<&str> = after.visual_inspection.iter().map(|e| e.location.as_str()).collect();
    locations.sort();
    assert_eq!(locations, vec!["Balcony", "Kitchen"]);
}

#[tokio::test]
async fn test_fork_store_failure_discards_images() {
    let dir = tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    let store = JsonFileStore::open(&config.data_dir).unwrap();
    let service = ReportService::new(&config, Arc::new(store));
    let id = service.create_report(intake("Kim")).await.unwrap();

    // 事後点検のコレクションを読めない状態にする
    std::fs::create_dir_all(config.data_dir.join("after-reports.json")).unwrap();

    let request = ForkRequest {
        drafts: vec![draft("Balcony", "Stain")],
        uploads: photos(dir.path(), 3),
        ..Default::default()
    };
    let err = service.fork_after_report(id, request).await.unwrap_err();

    assert!(matches!(err, ReportError::Storage(_)));
    assert!(upload_files(&config).is_empty());
}
