//! # Topic Tagging Module
//!
//! ## Purpose
//! Rule-based classifier mapping raw case text to legal topic tags from a
//! fixed taxonomy. Used only during offline indexing.
//!
//! ## Input/Output Specification
//! - **Input**: Case title and abstract text
//! - **Output**: Up to three topic tags, ordered by keyword-frequency score
//! - **Determinism**: Pure function; identical input yields identical output
//!
//! ## Key Features
//! - Fixed ten-category taxonomy with per-category keyword lists
//! - Case-insensitive substring counting (not word-boundary aware; a keyword
//!   occurring inside a longer word is counted — accepted heuristic limit)
//! - Stable tie-break on taxonomy declaration order
//! - Sentinel tag when no category matches

/// Sentinel tag returned when no taxonomy category matches
pub const FALLBACK_TAG: &str = "其他";

/// Maximum number of tags attached to a document
pub const MAX_TAGS: usize = 3;

/// Legal topic taxonomy: category name and its keyword list.
/// Declaration order is the tie-break order for equal scores.
const TAXONOMY: &[(&str, &[&str])] = &[
    (
        "合同纠纷",
        &[
            "合同纠纷", "合同", "违约", "缔约", "合同法", "合同履行", "合同解除", "合同终止",
            "协议", "约定", "买卖合同", "租赁合同",
        ],
    ),
    (
        "侵权责任",
        &[
            "侵权责任", "侵权", "损害赔偿", "损害", "赔偿", "侵害", "人身权", "名誉权",
            "人格权", "财产权", "精神损害",
        ],
    ),
    (
        "劳动争议",
        &[
            "劳动争议", "劳动", "劳动合同", "雇佣", "工资", "加班", "解雇", "工伤", "社保",
            "社会保险", "劳动法", "劳动关系",
        ],
    ),
    (
        "婚姻家庭",
        &[
            "婚姻家庭", "离婚", "婚姻", "抚养", "赡养", "继承", "财产分割", "家庭暴力",
            "子女抚养", "婚姻法", "夫妻财产", "抚养费",
        ],
    ),
    (
        "知识产权",
        &[
            "知识产权", "专利", "商标", "著作权", "版权", "盗版", "侵权", "发明", "商标权",
            "专利权", "版权法", "知识产权法",
        ],
    ),
    (
        "金融借贷",
        &[
            "金融借贷", "贷款", "借贷", "债务", "债权", "利息", "担保", "抵押", "借款合同",
            "放贷", "借款", "债权转让",
        ],
    ),
    (
        "房产纠纷",
        &[
            "房产纠纷", "房产", "房屋", "租赁", "产权", "物业", "拆迁", "房屋买卖合同",
            "房地产", "土地使用权",
        ],
    ),
    ("交通事故", &["交通事故", "肇事", "交通违章", "交通安全法", "车祸"]),
    (
        "刑事案件",
        &[
            "刑事案件", "刑事", "犯罪", "盗窃", "抢劫", "诈骗", "故意伤害", "杀人", "刑法",
            "拘留", "判刑", "刑事诉讼",
        ],
    ),
    (
        "行政诉讼",
        &[
            "行政诉讼", "行政", "政府", "处罚", "许可", "复议", "强制", "执法", "行政处罚",
            "行政复议", "行政许可", "行政诉讼法",
        ],
    ),
];

/// Extract up to three topic tags from a case title and abstract.
///
/// Scores each taxonomy category by the total number of non-overlapping,
/// case-insensitive occurrences of its keywords in the concatenated text,
/// then returns the top-scoring categories. Returns `["其他"]` when no
/// keyword occurs at all.
pub fn extract_tags(title: &str, abstract_text: &str) -> Vec<String> {
    let text = format!("{} {}", title, abstract_text).to_lowercase();

    let mut scored: Vec<(&str, usize)> = TAXONOMY
        .iter()
        .map(|(category, keywords)| {
            let score: usize = keywords
                .iter()
                .map(|keyword| text.matches(&keyword.to_lowercase()).count())
                .sum();
            (*category, score)
        })
        .collect();

    // Stable sort keeps taxonomy declaration order for equal scores
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let top: Vec<String> = scored
        .into_iter()
        .take(MAX_TAGS)
        .filter(|(_, score)| *score > 0)
        .map(|(category, _)| category.to_string())
        .collect();

    if top.is_empty() {
        vec![FALLBACK_TAG.to_string()]
    } else {
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_returns_fallback() {
        assert_eq!(extract_tags("", ""), vec![FALLBACK_TAG.to_string()]);
        assert_eq!(
            extract_tags("some english title", "nothing relevant"),
            vec![FALLBACK_TAG.to_string()]
        );
    }

    #[test]
    fn test_single_category_yields_single_tag() {
        let tags = extract_tags("交通事故责任纠纷", "被告驾车肇事");
        assert_eq!(tags, vec!["交通事故".to_string()]);
    }

    #[test]
    fn test_at_most_three_tags() {
        let title = "合同纠纷与劳动争议";
        let abstract_text = "涉及离婚财产分割、专利侵权以及贷款利息争议";
        let tags = extract_tags(title, abstract_text);
        assert!(tags.len() <= MAX_TAGS);
        for tag in &tags {
            assert_ne!(tag, FALLBACK_TAG);
        }
    }

    #[test]
    fn test_ordered_by_keyword_frequency() {
        // "劳动" appears three times, "合同" once
        let tags = extract_tags("劳动争议纠纷", "劳动者与用人单位因劳动合同发生争议");
        assert_eq!(tags.first().map(String::as_str), Some("劳动争议"));
    }

    #[test]
    fn test_deterministic() {
        let title = "买卖合同纠纷案";
        let abstract_text = "原告与被告签订买卖合同，被告违约";
        let first = extract_tags(title, abstract_text);
        for _ in 0..10 {
            assert_eq!(extract_tags(title, abstract_text), first);
        }
    }

    #[test]
    fn test_tie_break_follows_taxonomy_order() {
        // One hit each for 交通事故 ("车祸") and 刑事案件 ("犯罪");
        // 交通事故 is declared first and must win the tie.
        let tags = extract_tags("车祸", "犯罪");
        assert_eq!(
            tags,
            vec!["交通事故".to_string(), "刑事案件".to_string()]
        );
    }

    #[test]
    fn test_substring_counting_over_matches() {
        // "劳动" inside "劳动法" counts for the bare keyword too;
        // substring counting is the documented behavior.
        let tags = extract_tags("劳动法适用问题", "");
        assert_eq!(tags.first().map(String::as_str), Some("劳动争议"));
    }
}
