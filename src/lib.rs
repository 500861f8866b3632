//! Classroom Live - 课堂作业生命周期引擎
//!
//! 基于 Actix Web 构建的作业/提交生命周期后端：提交状态机、
//! 附件注册表、分层权限门与按班级房间的实时广播。
//!
//! # 架构
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `middlewares`: 认证中间件
//! - `models`: 数据模型定义
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层（状态机、权限门、房间广播）
//! - `storage`: 数据存储层（SeaORM + 文件字节存储）
//! - `utils`: 工具函数

pub mod config;
pub mod entity;
pub mod errors;
pub mod middlewares;
pub mod models;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
