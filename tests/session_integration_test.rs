//! 会话集成测试：轮次、反应、归档、导出与编排器命令循环

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use honeysuckle::archive::ArchiveManager;
    use honeysuckle::config::AppConfig;
    use honeysuckle::conversation::Role;
    use honeysuckle::core::{
        create_session, ChatError, Command, ReplyTexts, SessionPhase, TurnController, TurnOutcome,
        TurnRejection, UserInput,
    };
    use honeysuckle::export::{export_history, RoleLabels};
    use honeysuckle::llm::{ChatSession, LlmError, ScriptedLlmClient};
    use honeysuckle::storage::{ArchiveStore, LocalStore};

    fn controller_with(client: Arc<ScriptedLlmClient>) -> TurnController {
        TurnController::new(
            Ok(ChatSession::new(client, "system", 20)),
            ReplyTexts::default(),
            "Bắt đầu cuộc trò chuyện.",
        )
    }

    #[tokio::test]
    async fn test_full_conversation_flow() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Ok("Chào bạn! [EMOJI_REPLY: \"😊 Vui vẻ\", \"😢 Buồn\"]".to_string()),
            Ok("[EMOJI_REACTION: 😢] Mình ở đây nghe bạn. [QUICK_REPLY: \"Kể thêm\", \"Thôi\"]"
                .to_string()),
            Err(LlmError::Timeout(60)),
            Ok("Cảm ơn bạn nhé!".to_string()),
        ]));
        let controller = controller_with(client.clone());

        assert_eq!(controller.greet().await, TurnOutcome::Completed { displayed: true });
        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::Idle);
        assert_eq!(view.emoji_options.len(), 2);
        assert_eq!(view.messages[0].text(), "Chào bạn!");

        // 点选心情选项等同于发送 "emoji label"
        let choice = view.emoji_options[1].as_message();
        assert_eq!(
            controller.run_turn(UserInput::Text(choice)).await,
            TurnOutcome::Completed { displayed: true }
        );
        let view = controller.view();
        assert!(view.emoji_options.is_empty());
        assert_eq!(view.quick_replies, vec!["Kể thêm", "Thôi"]);
        assert_eq!(view.messages[1].text(), "😢 Buồn");
        assert_eq!(view.messages[1].reaction(), Some("😢"));
        assert_eq!(view.messages[2].text(), "Mình ở đây nghe bạn.");

        // 传输失败：追加致歉消息，输入重新开放
        assert_eq!(
            controller.run_turn(UserInput::Text("Kể thêm".into())).await,
            TurnOutcome::Failed
        );
        let view = controller.view();
        assert!(!view.input_locked);
        assert!(view.quick_replies.is_empty());
        assert_eq!(view.messages.last().unwrap().text(), ReplyTexts::default().send_failure);

        // 对第一条模型消息点选反应，只能点一次
        assert_eq!(
            controller.react_to_message(0, "❤️").await,
            TurnOutcome::Completed { displayed: true }
        );
        assert_eq!(controller.messages()[0].user_reaction(), Some("❤️"));
        assert_eq!(
            controller.react_to_message(0, "👍").await,
            TurnOutcome::Rejected(TurnRejection::ReactionNotApplicable)
        );

        let prompts = client.received();
        let last = prompts.last().unwrap().last().unwrap();
        assert_eq!(last.content, "[USER_REACTION: ❤️]");
        assert!(controller
            .messages()
            .iter()
            .all(|m| !m.text().contains("USER_REACTION")));
    }

    #[tokio::test]
    async fn test_init_failure_disables_session() {
        let controller = TurnController::new(
            Err(ChatError::Init("API key missing".into())),
            ReplyTexts::default(),
            "start",
        );
        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::Unavailable);
        assert!(view.input_locked);
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].role(), Role::Model);
        assert_eq!(
            controller.run_turn(UserInput::Text("hi".into())).await,
            TurnOutcome::Rejected(TurnRejection::NotInitialized)
        );
        assert_eq!(
            controller.greet().await,
            TurnOutcome::Rejected(TurnRejection::NotInitialized)
        );
    }

    #[tokio::test]
    async fn test_archive_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(ScriptedLlmClient::replies(["Chào!", "[EMOJI_REACTION: 👍] Tốt quá"]));
        let controller = controller_with(client);
        let mut archive = ArchiveManager::load(
            controller.clone(),
            ArchiveStore::new(LocalStore::new(dir.path())),
        );

        controller.greet().await;
        controller.run_turn(UserInput::Text("Mình vui".into())).await;
        let exported = export_history(&controller.messages(), &RoleLabels::default());
        assert_eq!(exported.lines().count(), 3);
        assert!(exported.lines().nth(1).unwrap().ends_with("You: Mình vui"));

        let entry = archive.archive_current_conversation().unwrap().unwrap();
        assert_eq!(entry.messages.len(), 3);
        assert!(controller.messages().is_empty());

        let stored = ArchiveStore::new(LocalStore::new(dir.path())).load().unwrap();
        assert_eq!(stored, vec![entry]);
    }

    #[tokio::test]
    async fn test_orchestrator_with_mock_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        cfg.app.data_dir = dir.path().to_path_buf();

        let (cmd_tx, mut conversation_rx, mut settings_rx) = create_session(cfg).await.unwrap();

        let wait = Duration::from_secs(5);
        tokio::time::timeout(
            wait,
            conversation_rx.wait_for(|v| v.phase == SessionPhase::Idle && v.messages.len() == 1),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!conversation_rx.borrow().emoji_options.is_empty());

        cmd_tx.send(Command::Submit("Mình buồn".to_string())).unwrap();
        tokio::time::timeout(
            wait,
            conversation_rx.wait_for(|v| !v.input_locked && v.messages.len() == 3),
        )
        .await
        .unwrap()
        .unwrap();
        {
            let view = conversation_rx.borrow();
            assert_eq!(view.messages[1].reaction(), Some("🤔"));
            assert_eq!(view.quick_replies.len(), 2);
        }

        cmd_tx.send(Command::Export).unwrap();
        tokio::time::timeout(
            wait,
            settings_rx.wait_for(|s| {
                s.notice
                    .as_deref()
                    .is_some_and(|n| n.starts_with("Đã xuất"))
            }),
        )
        .await
        .unwrap()
        .unwrap();
        let exported = dir.path().join("exports").join(format!(
            "HoneysuckleBot_History_{}.txt",
            chrono::Utc::now().date_naive().format("%Y-%m-%d")
        ));
        let transcript = std::fs::read_to_string(&exported).unwrap();
        assert_eq!(transcript.lines().count(), 3);
        assert!(transcript.lines().nth(1).unwrap().ends_with("You: Mình buồn"));

        cmd_tx.send(Command::SetReminder("20:30".to_string())).unwrap();
        tokio::time::timeout(wait, settings_rx.wait_for(|s| s.reminder.is_some()))
            .await
            .unwrap()
            .unwrap();

        cmd_tx.send(Command::Archive).unwrap();
        tokio::time::timeout(wait, settings_rx.wait_for(|s| s.archives.len() == 1))
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(wait, conversation_rx.wait_for(|v| v.messages.is_empty()))
            .await
            .unwrap()
            .unwrap();

        // 归档后对话为空，导出被拒绝且不写文件
        std::fs::remove_file(&exported).unwrap();
        cmd_tx.send(Command::Export).unwrap();
        tokio::time::timeout(
            wait,
            settings_rx.wait_for(|s| s.notice.as_deref() == Some("Không có gì để xuất.")),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!exported.exists());

        cmd_tx.send(Command::Quit).unwrap();
        assert!(dir.path().join(honeysuckle::storage::ARCHIVE_KEY).exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(honeysuckle::storage::REMINDER_KEY))
                .unwrap()
                .trim(),
            "20:30"
        );
    }
}
