use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("設定エラー: {0}")]
    Config(String),

    /// 入力不正（ID形式・ファイル形式・アップロード上限など）。書き込み前に中断する
    #[error("入力エラー: {0}")]
    Validation(String),

    #[error("見つかりません: {0}")]
    NotFound(String),

    /// 画像変換の失敗。バッチ全体を中断する
    #[error("画像処理エラー: {0}")]
    Processing(String),

    #[error("出力生成エラー: {0}")]
    Render(String),

    #[error("ストレージエラー: {0}")]
    Storage(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(inspection_report_common::Error),
}

impl From<inspection_report_common::Error> for ReportError {
    fn from(err: inspection_report_common::Error) -> Self {
        use inspection_report_common::Error as CommonError;
        match err {
            // ID形式・パネル名の誤りは呼び出し側で修正可能な入力エラー
            CommonError::InvalidId(id) => ReportError::Validation(format!("不正なID: {}", id)),
            CommonError::UnknownPanel(name) => {
                ReportError::Validation(format!("不明な点検パネル: {}", name))
            }
            other => ReportError::Common(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
