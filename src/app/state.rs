// ==========================================
// 碳排放数据导入系统 - 应用状态
// ==========================================
// 职责: 打开数据库、装配仓储 / 配置 / 模型客户端 / 文件处理器
// ==========================================

use std::sync::{Arc, Mutex};

use crate::config::{ConfigManager, PipelineConfigReader, PipelineSettings};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::record::{FileInput, ProcessingOptions, ProcessingResult};
use crate::importer::{FileProcessor, FileProcessorImpl};
use crate::llm::{DisabledModel, GenerativeModel, OpenAiCompatibleClient};
use crate::repository::{ClassificationCacheRepositoryImpl, MaterialLibraryRepositoryImpl};

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "EMISSION_IMPORT_DB_PATH";

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 物料库仓储（管理端写入，管道只读）
    pub material_repo: Arc<MaterialLibraryRepositoryImpl>,

    /// AI 分类缓存
    pub classification_cache: Arc<ClassificationCacheRepositoryImpl>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 启动时加载的管道参数
    pub settings: PipelineSettings,

    /// 文件处理器
    pub processor: Arc<FileProcessorImpl>,
}

impl AppState {
    /// 创建 AppState
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动创建并建表）
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let material_repo =
            Arc::new(MaterialLibraryRepositoryImpl::from_connection(conn.clone()));
        let classification_cache =
            Arc::new(ClassificationCacheRepositoryImpl::from_connection(conn.clone()));

        // ==========================================
        // 加载配置
        // ==========================================
        let config_manager = Arc::new(ConfigManager::from_connection(conn));
        let settings = config_manager
            .load_settings()
            .await
            .map_err(|e| format!("无法加载管道配置: {}", e))?;

        // ==========================================
        // 生成式模型（未配置 API Key 时禁用，AI 兜底全部降级）
        // ==========================================
        let model: Arc<dyn GenerativeModel> = if settings.llm.is_configured() {
            let client = OpenAiCompatibleClient::new(&settings.llm, settings.ai_timeout())
                .map_err(|e| format!("无法创建模型客户端: {}", e))?;
            tracing::info!(model = %settings.llm.model, "AI 兜底分类已启用");
            Arc::new(client)
        } else {
            tracing::warn!("未配置模型 API Key，AI 兜底分类将返回低置信度结果");
            Arc::new(DisabledModel)
        };

        let processor = Arc::new(FileProcessorImpl::new(
            material_repo.clone(),
            classification_cache.clone(),
            model,
            settings.clone(),
        ));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            material_repo,
            classification_cache,
            config_manager,
            settings,
            processor,
        })
    }

    /// 导入单个文件
    pub async fn import_file(
        &self,
        file: FileInput,
        options: ProcessingOptions,
    ) -> ProcessingResult {
        self.processor.process_file(file, options).await
    }
}

/// 获取默认数据库路径
///
/// 优先级: EMISSION_IMPORT_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./emission_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("emission-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("emission_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
