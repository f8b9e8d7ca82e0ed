// ==========================================
// 托盘结构情景测算 - 领域模型层
// ==========================================
// 职责: 定义作业类型、托盘量、费率、情景结果、分摊输入、收入流
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod defaults;
pub mod rates;
pub mod scenario;
pub mod stream;
pub mod types;
pub mod volume;

// 重导出核心类型
pub use allocation::{AllocationInputs, CostTriple, DirectStreamInput, MultiStreamInputs};
pub use rates::{RateTable, RatesSnapshot, ScopeItem, TypeRates, TypeRatesView};
pub use scenario::{ScenarioResult, ScenarioTotals, ScenarioTypeResult};
pub use stream::{ConcentrationRow, StreamRow, StreamSource};
pub use types::{PalletField, PerType, WorkType};
pub use volume::{clamp_pallets, PalletVolume, VolumeAssignment, MAX_PALLETS};
