// ==========================================
// 表格批处理入库作业 - 前缀匹配器
// ==========================================
// 职责: 标签规范化 + 唯一前缀解析（纯函数，不做 I/O）
// 规则: 规范化(候选).starts_with(规范化(前缀))，命中数必须恰好为 1
// ==========================================

use crate::config::MatchPolicy;
use crate::importer::error::ResolutionFailure;
use unicode_normalization::UnicodeNormalization;

/// 标签规范化
///
/// # 步骤（按策略开关）
/// 1. fold_accents: NFKD 分解后去掉组合附加符（é → e，全角 → 半角）
/// 2. case_insensitive: 转小写
/// 3. ignore_whitespace: 去掉全部空白；关闭时只做首尾 TRIM
pub fn normalize_label(text: &str, policy: &MatchPolicy) -> String {
    let mut normalized: String = if policy.fold_accents {
        text.nfkd()
            .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
            .collect()
    } else {
        text.to_string()
    };

    if policy.case_insensitive {
        normalized = normalized.to_lowercase();
    }

    if policy.ignore_whitespace {
        normalized.retain(|c| !c.is_whitespace());
    } else {
        normalized = normalized.trim().to_string();
    }

    normalized
}

/// 唯一前缀解析
///
/// # 返回
/// - Ok(label): 唯一命中的原始标签
/// - Err(NoMatch): 无命中（附全部候选）
/// - Err(Ambiguous): 多个命中（附全部命中项，不做猜测）
pub fn resolve_unique<S: AsRef<str>>(
    candidates: &[S],
    prefix: &str,
    policy: &MatchPolicy,
) -> Result<String, ResolutionFailure> {
    resolve_unique_with_markers(candidates, prefix, &[] as &[&str], policy)
}

/// 唯一前缀解析（附加标记约束）
///
/// markers 非空时，候选还须在规范化后包含其中任一标记
pub fn resolve_unique_with_markers<S: AsRef<str>, M: AsRef<str>>(
    candidates: &[S],
    prefix: &str,
    markers: &[M],
    policy: &MatchPolicy,
) -> Result<String, ResolutionFailure> {
    let normalized_prefix = normalize_label(prefix, policy);
    let normalized_markers: Vec<String> = markers
        .iter()
        .map(|m| normalize_label(m.as_ref(), policy))
        .filter(|m| !m.is_empty())
        .collect();

    let matches: Vec<String> = candidates
        .iter()
        .map(|c| c.as_ref())
        .filter(|candidate| {
            let normalized = normalize_label(candidate, policy);
            normalized.starts_with(&normalized_prefix)
                && (normalized_markers.is_empty()
                    || normalized_markers.iter().any(|m| normalized.contains(m.as_str())))
        })
        .map(|c| c.to_string())
        .collect();

    match matches.len() {
        1 => Ok(matches.into_iter().next().unwrap_or_default()),
        0 => Err(ResolutionFailure::NoMatch {
            candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
        }),
        _ => Err(ResolutionFailure::Ambiguous { matches }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_label_default_policy() {
        let policy = MatchPolicy::default();
        assert_eq!(normalize_label("  Emp  ID ", &policy), "empid");
        assert_eq!(normalize_label("Référence", &policy), "reference");
        assert_eq!(normalize_label("ＲＥＰＯＲＴ", &policy), "report");
        assert_eq!(normalize_label("材料 号", &policy), "材料号");
    }

    #[test]
    fn test_normalize_label_strict_policy() {
        let policy = MatchPolicy::strict();
        assert_eq!(normalize_label("  Emp  ID ", &policy), "Emp  ID");
        assert_eq!(normalize_label("Référence", &policy), "Référence");
    }

    #[test]
    fn test_resolve_unique_prefix_with_suffix() {
        let sheets = labels(&["Summary", "Report_2024_03", "Notes"]);
        let resolved = resolve_unique(&sheets, "Report_", &MatchPolicy::default()).unwrap();
        assert_eq!(resolved, "Report_2024_03");
    }

    #[test]
    fn test_resolve_unique_exact_label() {
        let sheets = labels(&["Report_"]);
        assert_eq!(
            resolve_unique(&sheets, "Report_", &MatchPolicy::default()).unwrap(),
            "Report_"
        );
    }

    #[test]
    fn test_resolve_unique_tolerates_case_and_whitespace() {
        let headers = labels(&["  emp id", "Flag?", "Note"]);
        let resolved = resolve_unique(&headers, "EMP ID", &MatchPolicy::default()).unwrap();
        assert_eq!(resolved, "  emp id");
    }

    #[test]
    fn test_resolve_unique_strict_is_case_sensitive() {
        let headers = labels(&["emp id"]);
        let result = resolve_unique(&headers, "Emp", &MatchPolicy::strict());
        assert!(matches!(result, Err(ResolutionFailure::NoMatch { .. })));
    }

    #[test]
    fn test_resolve_unique_no_match_lists_candidates() {
        let sheets = labels(&["Summary", "Notes"]);
        match resolve_unique(&sheets, "Report_", &MatchPolicy::default()) {
            Err(ResolutionFailure::NoMatch { candidates }) => assert_eq!(candidates, sheets),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unique_ambiguous_lists_matches() {
        let sheets = labels(&["Report_2024_03", "Report_2024_04", "Notes"]);
        match resolve_unique(&sheets, "Report_", &MatchPolicy::default()) {
            Err(ResolutionFailure::Ambiguous { matches }) => {
                assert_eq!(matches, labels(&["Report_2024_03", "Report_2024_04"]))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unique_prefix_not_substring() {
        // 前缀匹配，不是包含匹配
        let headers = labels(&["My Flag", "Note"]);
        assert!(resolve_unique(&headers, "Flag", &MatchPolicy::default()).is_err());
    }

    #[test]
    fn test_resolve_with_markers() {
        let headers = labels(&["Flag (Marker1)", "Flag comment", "Note"]);
        let resolved = resolve_unique_with_markers(
            &headers,
            "flag",
            &["marker1", "marker2"],
            &MatchPolicy::default(),
        )
        .unwrap();
        assert_eq!(resolved, "Flag (Marker1)");
    }

    #[test]
    fn test_resolve_with_markers_no_marker_present() {
        let headers = labels(&["Flag comment"]);
        let result =
            resolve_unique_with_markers(&headers, "flag", &["marker1"], &MatchPolicy::default());
        assert!(matches!(result, Err(ResolutionFailure::NoMatch { .. })));
    }

    #[test]
    fn test_duplicate_labels_are_ambiguous() {
        let headers = labels(&["Amount", "Amount"]);
        let result = resolve_unique(&headers, "Amount", &MatchPolicy::default());
        assert!(matches!(result, Err(ResolutionFailure::Ambiguous { .. })));
    }
}
