//! HoneysuckleBot
//!
//! 入口：加载配置、初始化日志、创建会话编排器与 TUI，并运行主循环。

use anyhow::Context;
use honeysuckle::{
    config::{load_config, AppConfig},
    core::create_session,
    export::RoleLabels,
    observability,
    ui::{run_app, UiConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, config_error) = match load_config(None) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // 日志写入数据目录（终端由 TUI 占用），默认 info，可通过 RUST_LOG 覆盖
    observability::init(&cfg.app.data_dir).context("Failed to initialize logging")?;
    if let Some(e) = config_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    let ui_config = UiConfig {
        app_name: cfg.app.name.clone(),
        labels: RoleLabels::from(&cfg.labels),
        reaction_palette: cfg.chat.reaction_palette.clone(),
    };

    // 创建会话：返回命令发送端、对话投影接收端、设置投影接收端
    let (cmd_tx, conversation_rx, settings_rx) =
        create_session(cfg).await.context("Failed to create session")?;

    run_app(conversation_rx, settings_rx, cmd_tx, ui_config)
        .await
        .context("App run failed")?;

    Ok(())
}
