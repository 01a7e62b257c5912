// ==========================================
// 碳排放数据导入系统 - 物料库 Repository 实现
// ==========================================
// 职责: 实现物料库查询（使用 rusqlite）
// 表: material_library + material_alias
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::material::MaterialLibraryEntry;
use crate::repository::blocking::with_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::material_library_repo::MaterialRepository;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 文本检索最多使用的关键词数量
const MAX_SEARCH_TOKENS: usize = 8;

// ==========================================
// MaterialLibraryRepositoryImpl
// ==========================================
pub struct MaterialLibraryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialLibraryRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入或覆盖物料库条目（含别名，事务化）
    ///
    /// 说明: 物料库由管理端维护，此方法用于种子数据与测试
    pub fn upsert_entry(&self, entry: &MaterialLibraryEntry) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO material_library (id, name, category, standard_unit, emission_factor, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                standard_unit = excluded.standard_unit,
                emission_factor = excluded.emission_factor,
                updated_at = excluded.updated_at
            "#,
            params![
                entry.id,
                entry.name,
                entry.category,
                entry.standard_unit,
                entry.emission_factor,
            ],
        )?;

        tx.execute(
            "DELETE FROM material_alias WHERE material_id = ?1",
            params![entry.id],
        )?;
        for alias in &entry.aliases {
            tx.execute(
                "INSERT OR IGNORE INTO material_alias (material_id, alias) VALUES (?1, ?2)",
                params![entry.id, alias],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 统计物料库条目数
    pub fn count_entries(&self) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM material_library", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<MaterialLibraryEntry> {
        Ok(MaterialLibraryEntry {
            id: row.get(0)?,
            name: row.get(1)?,
            aliases: Vec::new(),
            category: row.get(2)?,
            standard_unit: row.get(3)?,
            emission_factor: row.get(4)?,
        })
    }

    fn load_aliases(conn: &Connection, material_id: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT alias FROM material_alias WHERE material_id = ?1 ORDER BY alias",
        )?;
        let aliases = stmt
            .query_map(params![material_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(aliases)
    }

    fn with_aliases(
        conn: &Connection,
        mut entry: MaterialLibraryEntry,
    ) -> rusqlite::Result<MaterialLibraryEntry> {
        entry.aliases = Self::load_aliases(conn, &entry.id)?;
        Ok(entry)
    }
}

/// LIKE 模式转义（配合 ESCAPE '\'）
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// 切分检索关键词（字母数字连续段，长度 ≥ 2，去重保序）
fn search_tokens(normalized_query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in normalized_query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
    {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
        if tokens.len() >= MAX_SEARCH_TOKENS {
            break;
        }
    }
    tokens
}

#[async_trait]
impl MaterialRepository for MaterialLibraryRepositoryImpl {
    async fn find_by_name_or_alias(
        &self,
        name_or_alias: &str,
    ) -> RepositoryResult<Option<MaterialLibraryEntry>> {
        let needle = name_or_alias.to_string();

        with_connection(&self.conn, move |conn| {
            let by_name = conn
                .query_row(
                    r#"
                    SELECT id, name, category, standard_unit, emission_factor
                    FROM material_library
                    WHERE name = ?1 COLLATE NOCASE
                    ORDER BY id
                    LIMIT 1
                    "#,
                    params![needle],
                    Self::map_entry_row,
                )
                .optional()?;

            let found = match by_name {
                Some(entry) => Some(entry),
                None => conn
                    .query_row(
                        r#"
                        SELECT m.id, m.name, m.category, m.standard_unit, m.emission_factor
                        FROM material_library m
                        JOIN material_alias a ON a.material_id = m.id
                        WHERE a.alias = ?1 COLLATE NOCASE
                        ORDER BY m.id
                        LIMIT 1
                        "#,
                        params![needle],
                        Self::map_entry_row,
                    )
                    .optional()?,
            };

            match found {
                Some(entry) => Ok(Some(Self::with_aliases(conn, entry)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn text_search(
        &self,
        normalized_query: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<MaterialLibraryEntry>> {
        let query = normalized_query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        // 相关度 = 命中关键词数 + 整句命中加权
        let tokens = search_tokens(query);
        let mut values: Vec<Value> = Vec::with_capacity(tokens.len() + 2);
        let mut score_terms: Vec<String> = Vec::with_capacity(tokens.len() + 1);

        values.push(Value::Text(like_pattern(query)));
        score_terms.push(format!(
            "(CASE WHEN lower(name) LIKE ?{} ESCAPE '\\' THEN 2 ELSE 0 END)",
            values.len()
        ));
        for token in &tokens {
            values.push(Value::Text(like_pattern(token)));
            score_terms.push(format!(
                "(CASE WHEN lower(name) LIKE ?{} ESCAPE '\\' THEN 1 ELSE 0 END)",
                values.len()
            ));
        }
        values.push(Value::Integer(limit as i64));
        let limit_index = values.len();

        let sql = format!(
            r#"
            SELECT id, name, category, standard_unit, emission_factor FROM (
                SELECT id, name, category, standard_unit, emission_factor,
                       {} AS score
                FROM material_library
            )
            WHERE score > 0
            ORDER BY score DESC, length(name) ASC, name ASC
            LIMIT ?{}
            "#,
            score_terms.join(" + "),
            limit_index
        );

        with_connection(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params_from_iter(values), Self::map_entry_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            entries
                .into_iter()
                .map(|entry| Self::with_aliases(conn, entry).map_err(RepositoryError::from))
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_tokens() {
        assert_eq!(
            search_tokens("electricity (grid average)"),
            vec!["electricity", "grid", "average"]
        );
        assert_eq!(search_tokens("a b diesel diesel"), vec!["diesel"]);
        assert!(search_tokens("- / x").is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }
}
