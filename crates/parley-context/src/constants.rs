//! Prompt templates and section labels.

// =============================================================================
// System message
// =============================================================================

/// Opening of the system message sent on every turn.
pub const INTERVIEWER_PREAMBLE: &str =
    "你是一名专业的技术面试官。请根据职位描述和候选人简历，结合之前的对话，提出下一个面试问题或给出回应。";

pub const JD_SECTION_LABEL: &str = "【职位描述】";
pub const RESUME_SECTION_LABEL: &str = "【候选人简历】";
pub const RUNNING_SUMMARY_LABEL: &str = "【之前的对话摘要】";
pub const RELEVANT_HISTORY_LABEL: &str = "【相关历史对话】";
pub const RELEVANT_BACKGROUND_LABEL: &str = "【相关背景资料】";

// =============================================================================
// Summarizer
// =============================================================================

/// Instruction for compressing a block of rounds. `{target}` is replaced.
pub const CONVERSATION_SUMMARY_INSTRUCTION: &str = "请将以下面试对话压缩为不超过{target}字的摘要，保留候选人展示的关键技能、项目经历、回答质量和面试官关注的重点，不要编造内容。";

/// Instruction for merging an existing summary with a new one.
pub const MERGE_SUMMARY_INSTRUCTION: &str = "请将已有摘要与新增摘要合并为一份不超过{target}字的连贯摘要，保留所有关键信息，去除重复内容。";

/// Instruction for summarizing a resume.
pub const RESUME_SUMMARY_INSTRUCTION: &str =
    "请将以下候选人简历概括为不超过{target}字的摘要，保留技能、工作经历和代表性项目。";

/// Instruction for summarizing a job description.
pub const JD_SUMMARY_INSTRUCTION: &str =
    "请将以下职位描述概括为不超过{target}字的摘要，保留岗位职责和核心要求。";

pub const EXISTING_SUMMARY_LABEL: &str = "已有摘要：";
pub const NEW_SUMMARY_LABEL: &str = "新增摘要：";

/// Fill the `{target}` placeholder of an instruction.
pub fn with_target(template: &str, target: usize) -> String {
    template.replace("{target}", &target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_placeholder_filled() {
        let text = with_target(CONVERSATION_SUMMARY_INSTRUCTION, 500);
        assert!(text.contains("500字"));
        assert!(!text.contains("{target}"));
    }
}
