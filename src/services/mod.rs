pub mod chart_service;
pub mod curve_service;
pub mod news_points_service;
pub mod news_service;
pub mod news_strategies;
pub mod sentiment_service;
pub mod window_service;

pub use curve_service::{CurveChain, CurveService};
pub use news_points_service::NewsPointsService;
pub use news_service::{NewsService, NewsSettings, NewsStrategy};
pub use sentiment_service::{Classifier, ClassifyError, SentimentCache};
