// ==========================================
// 碳排放数据导入系统 - 字符串相似度
// ==========================================
// 算法: 归一化 Levenshtein
//   similarity = 1 - distance / max_len
// 实现: strsim（按字符计编辑距离）
// ==========================================

/// Levenshtein 编辑距离（按 Unicode 字符计）
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// 归一化相似度，取值 [0, 1]（两个空串视为完全相同）
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b).clamp(0.0, 1.0)
}
