use utoipa::OpenApi;

use crate::{
    entities::{
        phone_numbers::PhoneNumber,
        submissions::{Step, StepStatus, Submission},
    },
    error::ErrorResponse,
    handler,
    handler::{
        admin::{AdminResponse, LoginRequest, RegisterRequest},
        health::Health,
        phone_numbers::CreatePhoneNumber,
        submissions::{ReviewStepRequest, SubmitStepRequest},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::health::health,
        handler::submissions::submit_step,
        handler::submissions::get_submission,
        handler::submissions::watch_submission,
        handler::submissions::list_submissions,
        handler::submissions::review_step,
        handler::submissions::delete_submission,
        handler::phone_numbers::list_available,
        handler::phone_numbers::list_all,
        handler::phone_numbers::create_phone_number,
        handler::phone_numbers::delete_phone_number,
        handler::admin::register,
        handler::admin::login,
        handler::admin::logout,
        handler::admin::list_admins,
        handler::admin::approve_admin,
        handler::admin::delete_admin,
        handler::session::me
    ),
    components(schemas(
        Health,
        ErrorResponse,
        Submission,
        Step,
        StepStatus,
        SubmitStepRequest,
        ReviewStepRequest,
        PhoneNumber,
        CreatePhoneNumber,
        RegisterRequest,
        LoginRequest,
        AdminResponse
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "submissions", description = "Account bridging submissions and step review"),
        (name = "phone-numbers", description = "Pool of bridging phone numbers"),
        (name = "admin", description = "Admin accounts and sessions")
    )
)]
pub struct ApiDoc;
