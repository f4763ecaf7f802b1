use thiserror::Error;

use crate::app::builder::BuildError;
use crate::config::ConfigError;
use crate::ports::{GatewayError, StoreError};

/// ErrorKind は実行エラーの運用分類
///
/// - Transient: 一時的なエラー（次のパスで自然に再試行される）
/// - Permanent: 恒久的なエラー（同じ入力で再試行しても無意味）
/// - Infrastructure: ストア障害など、パス全体に効くもの
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("batch commit failed: {0}")]
    Commit(#[source] StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl HeraldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeraldError::Store(_) | HeraldError::Commit(_) => ErrorKind::Infrastructure,
            HeraldError::Gateway(e) => e.kind(),
            HeraldError::InvalidArgument(_) | HeraldError::Config(_) | HeraldError::Build(_) => {
                ErrorKind::Permanent
            }
        }
    }
}
