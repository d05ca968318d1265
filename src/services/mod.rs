pub mod adaptive_service;
pub mod analytics_service;
pub mod insight_service;
pub mod mock_service;
pub mod practice_service;
pub mod progress_service;
pub mod question_service;
pub mod shuffle_service;
