pub mod certificates;
pub mod courses;
pub mod materials;
pub mod quizzes;
