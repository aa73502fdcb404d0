//! Terminal output for the `tpod` CLI
//!
//! Interactive terminals get `cliclack` spinners and prompts; pipes and CI get
//! plain prefixed lines.
//!
//! ```rust,ignore
//! use tpod::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fetching pretrained model...");
//! spinner.stop("Pretrained model cached");
//! ui::key_value(&ctx, "Pipeline config", "/data/pipeline.config");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, remark, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
