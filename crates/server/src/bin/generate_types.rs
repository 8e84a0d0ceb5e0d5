use ts_rs::TS;

fn main() {
    let decls = [
        db::models::line_user::LineUser::decl(),
        db::models::location::Location::decl(),
        db::models::location::LocationSummary::decl(),
        db::models::sweet::Sweet::decl(),
        db::models::sweet::SweetListing::decl(),
        db::models::booking::BookingStatus::decl(),
        db::models::booking::Booking::decl(),
        db::models::booking::BookingWithSweet::decl(),
        db::models::reward_log::RewardLog::decl(),
        db::models::sweet_review::PublicReview::decl(),
        db::models::sweet_review::ReviewSummary::decl(),
        services::services::booking::NewBooking::decl(),
        services::services::review::NewReview::decl(),
        services::services::review::SweetReviews::decl(),
        services::services::review::CreatedReview::decl(),
        services::services::reward::RewardSummary::decl(),
        server::routes::login::LoginRequest::decl(),
        server::routes::login::LoginResponse::decl(),
        server::routes::login::UserResponse::decl(),
        server::routes::catalog::LocationsResponse::decl(),
        server::routes::catalog::SweetsResponse::decl(),
        server::routes::booking::BookingResponse::decl(),
        server::routes::booking::BookingsResponse::decl(),
        server::routes::reward::RewardResponse::decl(),
        server::routes::reward::RewardUpdate::decl(),
        server::routes::reward::RewardUpdateResponse::decl(),
        utils::response::ErrorBody::decl(),
        utils::response::StatusBody::decl(),
    ];

    println!("// Generated by generate_types; do not edit.\n");
    for decl in decls {
        println!("export {decl}\n");
    }
}
