//! herald-core
//!
//! Core building blocks for the Herald push-notification dispatcher.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, notification, message, outcome, batch）
//! - **ports**: 抽象化レイヤー（NotificationStore, UserDirectory, PushGateway, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, resolver, sender, recorder, dispatch_loop, trigger, login_alert）
//! - **impls**: 実装（InMemoryStore, InMemoryGateway など開発・テスト用）
//! - config / error / observability: 設定・エラー型・集計ビュー

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;

pub mod config;
pub mod error;
pub mod observability;

pub use self::config::HeraldConfig;
pub use self::error::{ErrorKind, HeraldError};
