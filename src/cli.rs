use clap::{Args, Parser, Subcommand};
use chrono::NaiveDate;
use inspection_report_common::{CustomerPatch, DefectEdit, DefectId, ReportId, ReportKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inspect")]
#[command(about = "住宅入居前後点検の報告書作成・PDF/画像出力ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// data/upload/exports をこのディレクトリ配下に置く（設定ファイルより優先）
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 報告書を新規作成（受付）
    Create {
        /// 点検日 (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// 団地名
        #[arg(long)]
        apartment: String,

        /// 棟
        #[arg(long)]
        dong: String,

        /// 号室
        #[arg(long)]
        home: String,

        /// 顧客名
        #[arg(long)]
        customer: String,

        /// 電話番号
        #[arg(long)]
        phone: String,
    },

    /// 報告書を表示
    Show {
        id: ReportId,

        /// 報告書の種類 (pre/after)
        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 報告書一覧（新しい順）
    List {
        /// 顧客名で絞り込み（大文字小文字を区別しない）
        #[arg(short, long)]
        search: Option<String>,
    },

    /// 顧客・物件情報を編集
    EditCustomer {
        id: ReportId,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        #[command(flatten)]
        customer: CustomerArgs,
    },

    /// 欠陥記録を追加（写真は採用された行の順に2枚ずつ割り当て）
    AddDefects {
        id: ReportId,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        #[command(flatten)]
        input: DefectInput,

        /// 一括登録として扱う（写真上限300枚、省略時は2枚）
        #[arg(long)]
        bulk: bool,
    },

    /// 欠陥記録を削除
    RemoveDefects {
        id: ReportId,

        /// 削除する欠陥記録ID
        #[arg(required = true)]
        entries: Vec<DefectId>,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,
    },

    /// 欠陥記録を編集
    EditDefect {
        /// 欠陥記録ID
        entry: DefectId,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        #[command(flatten)]
        fields: DefectFieldArgs,
    },

    /// 設備点検の結果を設定（パネル名 → 箇所ごとの項目のJSON）
    SetEquipment {
        id: ReportId,

        /// 入力JSONファイル
        input: PathBuf,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,
    },

    /// 事前点検から事後点検を作成（既にあれば更新）
    Fork {
        id: ReportId,

        #[command(flatten)]
        customer: CustomerArgs,

        #[command(flatten)]
        input: DefectInput,

        /// 引き継いだ記録のうち削除するID
        #[arg(long = "remove", value_delimiter = ',')]
        remove: Vec<DefectId>,
    },

    /// 事後点検が作成済みか確認
    AfterExists { id: ReportId },

    /// PDFを出力
    Pdf {
        id: ReportId,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// 透かし入り画像ZIPを出力
    Images {
        id: ReportId,

        #[arg(short, long, default_value = "pre")]
        kind: ReportKind,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// 設定を表示/保存
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 現在の設定を設定ファイルに保存
        #[arg(long)]
        save: bool,
    },
}

/// 顧客・物件情報（指定したものだけ更新）
#[derive(Args, Debug, Clone, Default)]
pub struct CustomerArgs {
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub apartment: Option<String>,
    #[arg(long)]
    pub dong: Option<String>,
    #[arg(long)]
    pub home: Option<String>,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl From<CustomerArgs> for CustomerPatch {
    fn from(args: CustomerArgs) -> Self {
        CustomerPatch {
            date: args.date,
            apartment_name: args.apartment,
            dong: args.dong,
            home: args.home,
            customer_name: args.customer,
            phone: args.phone,
        }
    }
}

/// 欠陥の入力（下書きJSON + 写真）
#[derive(Args, Debug, Clone, Default)]
pub struct DefectInput {
    /// 欠陥の下書きJSON（配列）
    #[arg(long)]
    pub drafts: Option<PathBuf>,

    /// 写真ファイル（送信順）
    #[arg(long = "photo")]
    pub photos: Vec<PathBuf>,

    /// 写真フォルダ（ファイル名順で --photo の後ろに追加）
    #[arg(long)]
    pub folder: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DefectFieldArgs {
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub sector: Option<String>,
    #[arg(long)]
    pub specific: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub extra: Option<String>,
}

impl From<DefectFieldArgs> for DefectEdit {
    fn from(args: DefectFieldArgs) -> Self {
        DefectEdit {
            location: args.location,
            sector: args.sector,
            specific: args.specific,
            content: args.content,
            extra: args.extra,
        }
    }
}
