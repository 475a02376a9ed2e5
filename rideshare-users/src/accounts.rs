use std::sync::Arc;

use futures_util::future::join_all;
use rideshare_core::models::{EmergencyContact, PrivacySettings};
use rideshare_core::{Caller, NotificationService, Role, User, UserStore};
use rideshare_shared::pii::mask_phone;
use rideshare_shared::Masked;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AccountError, CallReport, DeliveryReport, Location, NewUser, ProfileUpdate, ProfileView};
use crate::validation::{required, validate_email, validate_phone};

/// User accounts, profile privacy and the safety features built on the
/// notification provider.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn NotificationService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, notifier: Arc<dyn NotificationService>) -> Self {
        Self { users, notifier }
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User, AccountError> {
        let name = required(new_user.name, "name")?;
        let email = required(new_user.email, "email")?;
        let phone = required(new_user.phone, "phone")?;
        let role = new_user
            .role
            .ok_or_else(|| AccountError::Validation("role is required (Driver or Rider)".to_string()))?;

        validate_email(&email)?;
        validate_phone(&phone)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::Conflict("User already exists".to_string()));
        }

        let mut user = User::new(name, email, phone, role);
        user.profile_picture = new_user.profile_picture.filter(|p| !p.trim().is_empty());
        self.users.insert_user(&user).await?;

        info!("Registered {} {}", user.role, user.id);
        Ok(user)
    }

    /// The caller's own profile as other users would see it.
    pub async fn profile(&self, caller: &Caller) -> Result<ProfileView, AccountError> {
        let user = self.load(caller.user_id).await?;
        Ok(ProfileView::from(&user))
    }

    pub async fn update_profile(&self, caller: &Caller, update: ProfileUpdate) -> Result<ProfileView, AccountError> {
        let mut user = self.load(caller.user_id).await?;

        if let Some(name) = update.name {
            user.name = required(Some(name), "name")?;
        }
        if let Some(email) = update.email {
            let email = required(Some(email), "email")?;
            validate_email(&email)?;
            if let Some(existing) = self.users.find_by_email(&email).await? {
                if existing.id != user.id {
                    return Err(AccountError::Conflict("Email is already in use".to_string()));
                }
            }
            user.email = email;
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture).filter(|p| !p.trim().is_empty());
        }

        self.users.update_user(&user).await?;
        info!("Profile updated for {}", user.id);
        Ok(ProfileView::from(&user))
    }

    pub async fn update_privacy(
        &self,
        caller: &Caller,
        settings: PrivacySettings,
    ) -> Result<PrivacySettings, AccountError> {
        let mut user = self.load(caller.user_id).await?;
        user.privacy = settings;
        self.users.update_user(&user).await?;
        Ok(user.privacy)
    }

    /// Replace the caller's emergency contacts. Riders only.
    pub async fn set_emergency_contacts(
        &self,
        caller: &Caller,
        contacts: Vec<EmergencyContact>,
    ) -> Result<Vec<EmergencyContact>, AccountError> {
        if !caller.is(Role::Rider) {
            return Err(AccountError::Forbidden("Only Riders can add emergency contacts".to_string()));
        }

        let contacts = contacts
            .into_iter()
            .map(|c| {
                let name = required(Some(c.name), "contact name")?;
                let phone = required(Some(c.phone), "contact phone")?;
                validate_phone(&phone)?;
                Ok(EmergencyContact { name, phone })
            })
            .collect::<Result<Vec<_>, AccountError>>()?;

        let mut user = self.load(caller.user_id).await?;
        user.emergency_contacts = contacts;
        self.users.update_user(&user).await?;

        info!("Rider {} saved {} emergency contacts", user.id, user.emergency_contacts.len());
        Ok(user.emergency_contacts)
    }

    /// Text the caller's position to every emergency contact at once.
    pub async fn share_live_location(
        &self,
        caller: &Caller,
        location: Location,
    ) -> Result<Vec<DeliveryReport>, AccountError> {
        if !caller.is(Role::Rider) {
            return Err(AccountError::Forbidden("Only Riders can share location".to_string()));
        }
        if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.long) {
            return Err(AccountError::Validation("Location is out of range".to_string()));
        }

        let user = self.load(caller.user_id).await?;
        if user.emergency_contacts.is_empty() {
            return Err(AccountError::Validation("No emergency contacts found".to_string()));
        }

        let body = format!(
            "ALERT: {} is currently on a ride. Live Location: {}, {}.",
            user.name, location.lat, location.long
        );

        let deliveries = user.emergency_contacts.iter().map(|contact| {
            let body = body.as_str();
            async move {
                let to = Masked(contact.phone.clone());
                let result = self.notifier.send_sms(&to, body).await;
                (contact, result)
            }
        });

        let reports: Vec<DeliveryReport> = join_all(deliveries)
            .await
            .into_iter()
            .map(|(contact, result)| match result {
                Ok(delivery_id) => DeliveryReport {
                    contact_name: contact.name.clone(),
                    phone: mask_phone(&contact.phone),
                    delivered: true,
                    delivery_id: Some(delivery_id),
                    error: None,
                },
                Err(e) => {
                    warn!("Live location to {} failed: {}", Masked(contact.phone.as_str()), e);
                    DeliveryReport {
                        contact_name: contact.name.clone(),
                        phone: mask_phone(&contact.phone),
                        delivered: false,
                        delivery_id: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        if reports.iter().all(|r| !r.delivered) {
            return Err(AccountError::Dependency(
                "Live location could not be delivered to any contact".to_string(),
            ));
        }

        info!(
            "Rider {} shared live location with {}/{} contacts",
            user.id,
            reports.iter().filter(|r| r.delivered).count(),
            reports.len()
        );
        Ok(reports)
    }

    /// Connect the caller to a counterpart without exposing either number.
    pub async fn call_user(&self, caller: &Caller, target_id: Uuid) -> Result<CallReport, AccountError> {
        let target = self
            .users
            .find_user(target_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?;

        if target.role == caller.role {
            return Err(AccountError::Forbidden(
                "Calls can only be placed between a Rider and a Driver".to_string(),
            ));
        }

        let call_id = self.notifier.place_call(&Masked(target.phone)).await?;
        info!("Masked call {} from {} to {}", call_id, caller.user_id, target_id);
        Ok(CallReport { target_id, call_id })
    }

    async fn load(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rideshare_core::RecordingNotifier;
    use rideshare_store::MemoryUserStore;

    fn service() -> (AccountService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = AccountService::new(Arc::new(MemoryUserStore::new()), notifier.clone());
        (service, notifier)
    }

    fn new_user(name: &str, email: &str, phone: &str, role: Role) -> NewUser {
        NewUser {
            name: Some(name.into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
            role: Some(role),
            profile_picture: None,
        }
    }

    fn contact(name: &str, phone: &str) -> EmergencyContact {
        EmergencyContact { name: name.into(), phone: phone.into() }
    }

    #[tokio::test]
    async fn test_register_validates_and_rejects_duplicates() {
        let (service, _) = service();

        let user = service
            .register(new_user("Ana", "ana@example.com", "+15550000001", Role::Rider))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Rider);

        let dup = service
            .register(new_user("Ana Two", "ANA@example.com", "+15550000002", Role::Driver))
            .await;
        assert!(matches!(dup, Err(AccountError::Conflict(_))));

        let bad_phone = service
            .register(new_user("Bo", "bo@example.com", "555-0101", Role::Driver))
            .await;
        assert!(matches!(bad_phone, Err(AccountError::Validation(_))));

        let no_role = NewUser { role: None, ..new_user("Cy", "cy@example.com", "+15550000003", Role::Rider) };
        assert!(matches!(service.register(no_role).await, Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_privacy_changes_profile_view() {
        let (service, _) = service();
        let user = service
            .register(new_user("Ana Lopez", "ana@example.com", "+15550009876", Role::Rider))
            .await
            .unwrap();
        let caller = Caller::new(user.id, user.role);

        let view = service.profile(&caller).await.unwrap();
        assert_eq!(view.name, "Ana Lopez");
        assert_eq!(view.phone, "+XX-XXXXXX9876");

        service
            .update_privacy(&caller, PrivacySettings { hide_full_name: true, blur_profile_picture: true })
            .await
            .unwrap();
        let view = service.profile(&caller).await.unwrap();
        assert_eq!(view.name, "A...");
        assert_eq!(view.profile_picture.as_deref(), Some("blurred.jpg"));
    }

    #[tokio::test]
    async fn test_update_profile_email_conflict() {
        let (service, _) = service();
        let a = service.register(new_user("A", "a@example.com", "+15550000001", Role::Rider)).await.unwrap();
        service.register(new_user("B", "b@example.com", "+15550000002", Role::Driver)).await.unwrap();
        let caller = Caller::new(a.id, a.role);

        let taken = ProfileUpdate { email: Some("b@example.com".into()), ..ProfileUpdate::default() };
        assert!(matches!(service.update_profile(&caller, taken).await, Err(AccountError::Conflict(_))));

        let rename = ProfileUpdate { name: Some("Alice".into()), ..ProfileUpdate::default() };
        assert_eq!(service.update_profile(&caller, rename).await.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn test_emergency_contacts_are_rider_only() {
        let (service, _) = service();
        let driver = service.register(new_user("D", "d@example.com", "+15550000001", Role::Driver)).await.unwrap();
        let caller = Caller::new(driver.id, driver.role);

        let result = service.set_emergency_contacts(&caller, vec![contact("Mom", "+15550000009")]).await;
        assert!(matches!(result, Err(AccountError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_live_location_reports_each_contact() {
        let (service, notifier) = service();
        let rider = service.register(new_user("Ana", "ana@example.com", "+15550000001", Role::Rider)).await.unwrap();
        let caller = Caller::new(rider.id, rider.role);
        let here = Location { lat: 12.97, long: 77.59 };

        let none = service.share_live_location(&caller, here).await;
        assert!(matches!(none, Err(AccountError::Validation(_))));

        service
            .set_emergency_contacts(&caller, vec![contact("Mom", "+15550000011"), contact("Sam", "+15550000022")])
            .await
            .unwrap();
        notifier.fail_for("+15550000022");

        let reports = service.share_live_location(&caller, here).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].delivered);
        assert!(!reports[1].delivered);
        assert_eq!(reports[1].phone, "+XX-XXXXXX0022");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body.as_deref(),
            Some("ALERT: Ana is currently on a ride. Live Location: 12.97, 77.59.")
        );

        notifier.set_failing(true);
        let all_failed = service.share_live_location(&caller, here).await;
        assert!(matches!(all_failed, Err(AccountError::Dependency(_))));
    }

    #[tokio::test]
    async fn test_call_requires_rider_driver_pair() {
        let (service, notifier) = service();
        let rider = service.register(new_user("R", "r@example.com", "+15550000001", Role::Rider)).await.unwrap();
        let other = service.register(new_user("O", "o@example.com", "+15550000002", Role::Rider)).await.unwrap();
        let driver = service.register(new_user("D", "d@example.com", "+15550000003", Role::Driver)).await.unwrap();
        let caller = Caller::new(rider.id, rider.role);

        assert!(matches!(service.call_user(&caller, other.id).await, Err(AccountError::Forbidden(_))));
        assert!(matches!(service.call_user(&caller, Uuid::new_v4()).await, Err(AccountError::NotFound(_))));

        let report = service.call_user(&caller, driver.id).await.unwrap();
        assert_eq!(report.target_id, driver.id);
        assert_eq!(notifier.sent()[0].to, "+15550000003");
        assert!(notifier.sent()[0].body.is_none());
    }
}
