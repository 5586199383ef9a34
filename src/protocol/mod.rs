//! 回复协议层：模型回复中的内嵌指令（表情反应、心情选项、快捷回复）与用户反应令牌

pub mod directive;

pub use directive::{parse_reply, user_reaction_token, EmojiOption, ParsedReply};
