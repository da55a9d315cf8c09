//! User-facing strings in the three interface languages.

use academy_core::config::Language;

pub struct Messages {
    pub login_failed: &'static str,
    pub credentials_required: &'static str,
    pub connection_failed: &'static str,
    pub session_expired: &'static str,
    pub logged_out: &'static str,
    pub answer_all_questions: &'static str,
    pub passed_title: &'static str,
    pub failed_title: &'static str,
    pub passed_body: &'static str,
    pub failed_body: &'static str,
    pub your_score: &'static str,
    pub material_completed: &'static str,
    pub comment_posted: &'static str,
    pub comment_empty: &'static str,
    pub search_empty: &'static str,
    pub refreshing: &'static str,
    pub certificate_issued: &'static str,
}

const RU: Messages = Messages {
    login_failed: "Неверное имя пользователя или пароль",
    credentials_required: "Введите имя пользователя и пароль",
    connection_failed: "Не удалось подключиться к серверу",
    session_expired: "Сессия истекла, войдите снова",
    logged_out: "Вы вышли из системы",
    answer_all_questions: "Пожалуйста, ответьте на все вопросы",
    passed_title: "Поздравляем!",
    failed_title: "Попробуйте еще раз",
    passed_body: "Вы успешно прошли тест!",
    failed_body: "К сожалению, вы не прошли тест. Попробуйте снова после повторения материала.",
    your_score: "Ваш результат",
    material_completed: "Выполнено",
    comment_posted: "Комментарий добавлен",
    comment_empty: "Комментарий не может быть пустым",
    search_empty: "Введите поисковый запрос",
    refreshing: "Обновление данных...",
    certificate_issued: "Сертификат выдан",
};

const EN: Messages = Messages {
    login_failed: "Invalid username or password",
    credentials_required: "Username and password required",
    connection_failed: "Unable to connect to server",
    session_expired: "Session expired, please log in again",
    logged_out: "Logged out",
    answer_all_questions: "Please answer all questions",
    passed_title: "Congratulations!",
    failed_title: "Try again",
    passed_body: "You passed the test!",
    failed_body: "Unfortunately you did not pass. Review the material and try again.",
    your_score: "Your score",
    material_completed: "Completed",
    comment_posted: "Comment posted",
    comment_empty: "Comment cannot be empty",
    search_empty: "Enter a search query",
    refreshing: "Refreshing data...",
    certificate_issued: "Certificate issued",
};

const KY: Messages = Messages {
    login_failed: "Колдонуучунун аты же сырсөз туура эмес",
    credentials_required: "Колдонуучунун атын жана сырсөздү киргизиңиз",
    connection_failed: "Серверге туташуу мүмкүн болгон жок",
    session_expired: "Сессия бүттү, кайра кириңиз",
    logged_out: "Сиз системадан чыктыңыз",
    answer_all_questions: "Сураныч, бардык суроолорго жооп бериңиз",
    passed_title: "Куттуктайбыз!",
    failed_title: "Дагы аракет кылыңыз",
    passed_body: "Сиз тесттен ийгиликтүү өттүңүз!",
    failed_body: "Тилекке каршы, сиз тесттен өткөн жоксуз. Материалды кайталап, кайра аракет кылыңыз.",
    your_score: "Сиздин жыйынтык",
    material_completed: "Аткарылды",
    comment_posted: "Комментарий кошулду",
    comment_empty: "Комментарий бош болбошу керек",
    search_empty: "Издөө суроосун киргизиңиз",
    refreshing: "Маалымат жаңыртылууда...",
    certificate_issued: "Сертификат берилди",
};

impl Messages {
    pub fn for_language(language: Language) -> &'static Messages {
        match language {
            Language::Ru => &RU,
            Language::En => &EN,
            Language::Ky => &KY,
        }
    }
}
